use std::fmt;

use serde::{Deserialize, Serialize};

/// Funnel-ordered engagement events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackingEvent {
    Impression,
    View,
    Click,
}

impl TrackingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingEvent::Impression => "impression",
            TrackingEvent::View => "view",
            TrackingEvent::Click => "click",
        }
    }

    /// The violation reported when this event arrives ahead of its prerequisite.
    pub fn violation(&self) -> Option<OrderingViolation> {
        match self {
            TrackingEvent::Impression => None,
            TrackingEvent::View => Some(OrderingViolation::ExceedsImpressions),
            TrackingEvent::Click => Some(OrderingViolation::ExceedsViews),
        }
    }
}

impl fmt::Display for TrackingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of `clicks <= views <= impressions` an update would break
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderingViolation {
    ExceedsImpressions,
    ExceedsViews,
}

impl fmt::Display for OrderingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingViolation::ExceedsImpressions => f.write_str("views would exceed impressions"),
            OrderingViolation::ExceedsViews => f.write_str("clicks would exceed views"),
        }
    }
}

/// Raw counters, the only authoritative performance state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counters {
    pub impressions: u64,
    pub views: u64,
    pub clicks: u64,
}

impl Counters {
    pub fn new(impressions: u64, views: u64, clicks: u64) -> Self {
        Self { impressions, views, clicks }
    }

    /// Checks whether one more `event` keeps the funnel ordered.
    pub fn check(&self, event: TrackingEvent) -> Result<(), OrderingViolation> {
        let blocked = match event {
            TrackingEvent::Impression => false,
            TrackingEvent::View => self.views >= self.impressions,
            TrackingEvent::Click => self.clicks >= self.views,
        };
        match event.violation() {
            Some(violation) if blocked => Err(violation),
            _ => Ok(()),
        }
    }

    /// Applies one event. Counters are left untouched when the event is rejected.
    pub fn apply(&mut self, event: TrackingEvent) -> Result<(), OrderingViolation> {
        self.check(event)?;
        match event {
            TrackingEvent::Impression => self.impressions += 1,
            TrackingEvent::View => self.views += 1,
            TrackingEvent::Click => self.clicks += 1,
        }
        Ok(())
    }

    pub fn click_through_rate(&self) -> f64 {
        if self.views == 0 {
            return 0.0;
        }
        100.0 * self.clicks as f64 / self.views as f64
    }

    pub fn engagement_rate(&self, weights: &EngagementWeights) -> f64 {
        let total_weight = weights.view_weight + weights.click_weight;
        if self.impressions == 0 || total_weight <= 0.0 {
            return 0.0;
        }
        let weighted = weights.view_weight * self.views as f64 + weights.click_weight * self.clicks as f64;
        (100.0 * weighted / (total_weight * self.impressions as f64)).clamp(0.0, 100.0)
    }

    pub fn performance(&self, weights: &EngagementWeights) -> Performance {
        Performance {
            impressions: self.impressions,
            views: self.views,
            clicks: self.clicks,
            click_through_rate: self.click_through_rate(),
            engagement_rate: self.engagement_rate(weights),
        }
    }
}

/// Relative weight of views and clicks in the engagement rate.
///
/// The rate is a business input, so both weights come from configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EngagementWeights {
    #[serde(default = "default_weight")]
    pub view_weight: f64,
    #[serde(default = "default_weight")]
    pub click_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            view_weight: default_weight(),
            click_weight: default_weight(),
        }
    }
}

/// Counters plus the rates derived from them, as exposed over the API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub impressions: u64,
    pub views: u64,
    pub clicks: u64,
    pub click_through_rate: f64,
    pub engagement_rate: f64,
}

impl Performance {
    pub fn counters(&self) -> Counters {
        Counters::new(self.impressions, self.views, self.clicks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_rejected_when_clicks_equal_views() {
        let mut counters = Counters::new(10, 5, 5);

        let result = counters.apply(TrackingEvent::Click);

        assert_eq!(result, Err(OrderingViolation::ExceedsViews));
        assert_eq!(counters, Counters::new(10, 5, 5));
    }

    #[test]
    fn test_view_rejected_without_impression() {
        let mut counters = Counters::default();
        assert_eq!(counters.apply(TrackingEvent::View), Err(OrderingViolation::ExceedsImpressions));

        counters.apply(TrackingEvent::Impression).unwrap();
        counters.apply(TrackingEvent::View).unwrap();
        assert_eq!(counters, Counters::new(1, 1, 0));
    }

    #[test]
    fn test_funnel_invariant_holds_for_any_replay() {
        let events = [
            TrackingEvent::Click,
            TrackingEvent::View,
            TrackingEvent::Impression,
            TrackingEvent::Click,
            TrackingEvent::View,
            TrackingEvent::View,
            TrackingEvent::Impression,
            TrackingEvent::Impression,
            TrackingEvent::Click,
            TrackingEvent::View,
            TrackingEvent::Click,
            TrackingEvent::Click,
        ];

        // Replay every rotation of the sequence so each event gets a turn at each position.
        for shift in 0..events.len() {
            let mut counters = Counters::default();
            for event in events.iter().cycle().skip(shift).take(events.len() * 3) {
                let _ = counters.apply(*event);
                assert!(counters.clicks <= counters.views);
                assert!(counters.views <= counters.impressions);
            }
        }
    }

    #[test]
    fn test_click_through_rate() {
        assert_eq!(Counters::new(0, 0, 0).click_through_rate(), 0.0);
        assert_eq!(Counters::new(100, 40, 10).click_through_rate(), 25.0);

        let performance = Counters::new(9, 3, 1).performance(&EngagementWeights::default());
        assert_eq!(performance.click_through_rate, 100.0 * 1.0 / 3.0);
    }

    #[test]
    fn test_engagement_rate_weights() {
        let counters = Counters::new(100, 50, 10);

        // (50 + 10) / (2 * 100)
        assert!((counters.engagement_rate(&EngagementWeights::default()) - 30.0).abs() < 1e-9);

        let views_only = EngagementWeights { view_weight: 1.0, click_weight: 0.0 };
        assert!((counters.engagement_rate(&views_only) - 50.0).abs() < 1e-9);

        let disabled = EngagementWeights { view_weight: 0.0, click_weight: 0.0 };
        assert_eq!(counters.engagement_rate(&disabled), 0.0);
        assert_eq!(Counters::default().engagement_rate(&EngagementWeights::default()), 0.0);
    }
}
