use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::advertisement::{Advertisement, Platform};
use crate::eligibility::filter_eligible;
use crate::performance::{Performance, TrackingEvent};
use crate::repository::AdRepository;
use crate::selection::SelectionPolicy;
use crate::{CoreError, CoreResult};

/// Picks the advertisement to show for a placement request
#[derive(Clone)]
pub struct AdDelivery {
    repo: Arc<dyn AdRepository>,
    policy: SelectionPolicy,
}

impl AdDelivery {
    pub fn new(repo: Arc<dyn AdRepository>, policy: SelectionPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// `Ok(None)` means no ad is currently schedulable, which is a normal outcome.
    pub async fn pick(&self, platform: Platform, now: DateTime<Utc>) -> CoreResult<Option<Advertisement>> {
        let candidates = self.repo.list_delivery_candidates(platform).await?;
        let eligible = filter_eligible(candidates, platform, now);
        debug!("{} eligible ads for {} at {}", eligible.len(), platform, now);

        Ok(self.policy.select_one(&eligible).cloned())
    }
}

/// Records funnel events against the repository
#[derive(Clone)]
pub struct PerformanceTracker {
    repo: Arc<dyn AdRepository>,
}

impl PerformanceTracker {
    pub fn new(repo: Arc<dyn AdRepository>) -> Self {
        Self { repo }
    }

    pub async fn record_impression(&self, ad_id: Uuid) -> CoreResult<Performance> {
        self.record(ad_id, TrackingEvent::Impression).await
    }

    pub async fn record_view(&self, ad_id: Uuid) -> CoreResult<Performance> {
        self.record(ad_id, TrackingEvent::View).await
    }

    pub async fn record_click(&self, ad_id: Uuid) -> CoreResult<Performance> {
        self.record(ad_id, TrackingEvent::Click).await
    }

    pub async fn record(&self, ad_id: Uuid, event: TrackingEvent) -> CoreResult<Performance> {
        let result = self.repo.record_event(ad_id, event).await;
        if let Err(CoreError::OrderingViolation { violation, .. }) = &result {
            // Usually out-of-order delivery from the client; it may retry or drop.
            warn!("Rejected {} for ad {}: {}", event, ad_id, violation);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::{Advertiser, Placement, Scheduling, TargetAudience};
    use crate::performance::{Counters, EngagementWeights};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Vec-backed repository; hands out every ad as a delivery candidate.
    struct FixedRepo {
        ads: Mutex<Vec<Advertisement>>,
    }

    #[async_trait]
    impl AdRepository for FixedRepo {
        async fn create_advertisement(&self, ad: &Advertisement) -> CoreResult<()> {
            self.ads.lock().unwrap().push(ad.clone());
            Ok(())
        }

        async fn get_advertisement(&self, id: Uuid) -> CoreResult<Option<Advertisement>> {
            Ok(self.ads.lock().unwrap().iter().find(|ad| ad.id == id).cloned())
        }

        async fn list_advertisements(&self, _platform: Option<Platform>) -> CoreResult<Vec<Advertisement>> {
            Ok(self.ads.lock().unwrap().clone())
        }

        async fn set_active(&self, _id: Uuid, _is_active: bool) -> CoreResult<Option<Advertisement>> {
            Ok(None)
        }

        async fn record_event(&self, id: Uuid, event: TrackingEvent) -> CoreResult<Performance> {
            let mut ads = self.ads.lock().unwrap();
            let ad = ads.iter_mut().find(|ad| ad.id == id).ok_or(CoreError::NotFound(id))?;
            let mut counters = ad.performance.counters();
            let weights = EngagementWeights::default();
            if let Err(violation) = counters.apply(event) {
                return Err(CoreError::OrderingViolation {
                    violation,
                    performance: counters.performance(&weights),
                });
            }
            ad.performance = counters.performance(&weights);
            Ok(ad.performance)
        }
    }

    fn ad(title: &str, platform: Platform, is_active: bool) -> Advertisement {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Advertisement {
            id: Uuid::new_v4(),
            title: title.to_string(),
            advertiser: Advertiser {
                name: "Acme".into(),
                website: None,
                contact_email: None,
            },
            placement: Placement {
                platforms: vec![platform],
                target_audience: TargetAudience::default(),
            },
            video_url: "https://cdn.example/a.mp4".into(),
            duration: 10,
            shop_now_text: None,
            shop_now_url: None,
            scheduling: Scheduling {
                start_date: created,
                end_date: None,
                is_active,
            },
            performance: Performance::default(),
            created_at: created,
            updated_at: created,
        }
    }

    fn repo(ads: Vec<Advertisement>) -> Arc<dyn AdRepository> {
        Arc::new(FixedRepo { ads: Mutex::new(ads) })
    }

    #[tokio::test]
    async fn test_pick_skips_ineligible_candidates() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let paused = ad("paused", Platform::Youtube, false);
        let wrong_platform = ad("reel", Platform::Instagram, true);
        let live = ad("live", Platform::Youtube, true);
        let live_id = live.id;

        let delivery = AdDelivery::new(repo(vec![paused, wrong_platform, live]), SelectionPolicy::First);

        let picked = delivery.pick(Platform::Youtube, now).await.unwrap();
        assert_eq!(picked.map(|ad| ad.id), Some(live_id));
    }

    #[tokio::test]
    async fn test_pick_returns_none_when_nothing_is_live() {
        let before_start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let delivery = AdDelivery::new(repo(vec![ad("later", Platform::Youtube, true)]), SelectionPolicy::Random);

        assert!(delivery.pick(Platform::Youtube, before_start).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tracker_surfaces_violation_with_counters() {
        let mut seeded = ad("seeded", Platform::Youtube, true);
        seeded.performance = Counters::new(3, 1, 1).performance(&EngagementWeights::default());
        let id = seeded.id;
        let tracker = PerformanceTracker::new(repo(vec![seeded]));

        match tracker.record_click(id).await {
            Err(CoreError::OrderingViolation { violation, performance }) => {
                assert_eq!(violation, crate::OrderingViolation::ExceedsViews);
                assert_eq!(performance.counters(), Counters::new(3, 1, 1));
            }
            other => panic!("expected ordering violation, got {:?}", other),
        }

        let after_view = tracker.record_view(id).await.unwrap();
        assert_eq!(after_view.counters(), Counters::new(3, 2, 1));

        assert!(matches!(tracker.record_impression(Uuid::new_v4()).await, Err(CoreError::NotFound(_))));
    }
}
