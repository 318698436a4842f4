use adreel_core::{
    AdRepository, Advertisement, CoreError, CoreResult, EngagementWeights, Performance, Platform, TrackingEvent,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory advertisement store, used by the tests.
///
/// Ads keep insertion order. Each tracking event checks and increments under
/// a single write lock.
pub struct InMemoryAdRepository {
    ads: RwLock<Vec<Advertisement>>,
    weights: EngagementWeights,
}

impl InMemoryAdRepository {
    pub fn new(weights: EngagementWeights) -> Self {
        Self {
            ads: RwLock::new(Vec::new()),
            weights,
        }
    }

    pub async fn len(&self) -> usize {
        self.ads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ads.read().await.is_empty()
    }
}

impl Default for InMemoryAdRepository {
    fn default() -> Self {
        Self::new(EngagementWeights::default())
    }
}

#[async_trait]
impl AdRepository for InMemoryAdRepository {
    async fn create_advertisement(&self, ad: &Advertisement) -> CoreResult<()> {
        let mut ads = self.ads.write().await;
        if ads.iter().any(|existing| existing.id == ad.id) {
            return Err(CoreError::StorageError(format!("duplicate advertisement id {}", ad.id)));
        }

        let mut stored = ad.clone();
        // Rates are derived, never trusted from the caller.
        stored.performance = ad.performance.counters().performance(&self.weights);
        ads.push(stored);
        Ok(())
    }

    async fn get_advertisement(&self, id: Uuid) -> CoreResult<Option<Advertisement>> {
        let ads = self.ads.read().await;
        Ok(ads.iter().find(|ad| ad.id == id).cloned())
    }

    async fn list_advertisements(&self, platform: Option<Platform>) -> CoreResult<Vec<Advertisement>> {
        let ads = self.ads.read().await;
        Ok(ads
            .iter()
            .filter(|ad| platform.map_or(true, |p| ad.placement.targets(p)))
            .cloned()
            .collect())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> CoreResult<Option<Advertisement>> {
        let mut ads = self.ads.write().await;
        let Some(ad) = ads.iter_mut().find(|ad| ad.id == id) else {
            return Ok(None);
        };

        ad.scheduling.is_active = is_active;
        ad.updated_at = Utc::now();
        Ok(Some(ad.clone()))
    }

    async fn record_event(&self, id: Uuid, event: TrackingEvent) -> CoreResult<Performance> {
        let mut ads = self.ads.write().await;
        let ad = ads
            .iter_mut()
            .find(|ad| ad.id == id)
            .ok_or(CoreError::NotFound(id))?;

        let mut counters = ad.performance.counters();
        if let Err(violation) = counters.apply(event) {
            return Err(CoreError::OrderingViolation {
                violation,
                performance: ad.performance,
            });
        }

        ad.performance = counters.performance(&self.weights);
        ad.updated_at = Utc::now();
        Ok(ad.performance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreel_core::{
        AdDelivery, Advertiser, Counters, OrderingViolation, PerformanceTracker, Placement, Scheduling,
        SelectionPolicy, TargetAudience,
    };
    use chrono::{DateTime, TimeZone};
    use std::sync::Arc;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn ad(title: &str, platforms: Vec<Platform>, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Advertisement {
        Advertisement {
            id: Uuid::new_v4(),
            title: title.to_string(),
            advertiser: Advertiser {
                name: "Acme".to_string(),
                website: Some("https://acme.example".to_string()),
                contact_email: None,
            },
            placement: Placement {
                platforms,
                target_audience: TargetAudience::default(),
            },
            video_url: "https://cdn.example/ad.mp4".to_string(),
            duration: 20,
            shop_now_text: None,
            shop_now_url: None,
            scheduling: Scheduling {
                start_date: start,
                end_date: end,
                is_active: true,
            },
            performance: Performance::default(),
            created_at: start,
            updated_at: start,
        }
    }

    async fn seeded(counters: Counters) -> (Arc<InMemoryAdRepository>, Uuid) {
        let repo = Arc::new(InMemoryAdRepository::default());
        let mut a = ad("seeded", vec![Platform::Youtube], at(2024, 1, 1), None);
        a.performance = counters.performance(&EngagementWeights::default());
        let id = a.id;
        repo.create_advertisement(&a).await.unwrap();
        (repo, id)
    }

    #[tokio::test]
    async fn test_click_rejected_leaves_counters_unchanged() {
        let (repo, id) = seeded(Counters::new(8, 5, 5)).await;
        let tracker = PerformanceTracker::new(repo.clone());

        let err = tracker.record_click(id).await.unwrap_err();
        match err {
            CoreError::OrderingViolation { violation, performance } => {
                assert_eq!(violation, OrderingViolation::ExceedsViews);
                assert_eq!(performance.counters(), Counters::new(8, 5, 5));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let stored = repo.get_advertisement(id).await.unwrap().unwrap();
        assert_eq!(stored.performance.counters(), Counters::new(8, 5, 5));
    }

    #[tokio::test]
    async fn test_funnel_and_rates_after_updates() {
        let (repo, id) = seeded(Counters::default()).await;
        let tracker = PerformanceTracker::new(repo.clone());

        assert!(tracker.record_view(id).await.is_err());
        for _ in 0..4 {
            tracker.record_impression(id).await.unwrap();
        }
        tracker.record_view(id).await.unwrap();
        tracker.record_view(id).await.unwrap();
        let performance = tracker.record_click(id).await.unwrap();

        assert_eq!(performance.counters(), Counters::new(4, 2, 1));
        assert_eq!(performance.click_through_rate, 50.0);
        // (2 + 1) / (2 * 4)
        assert!((performance.engagement_rate - 37.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_ad_is_not_found() {
        let repo = Arc::new(InMemoryAdRepository::default());
        let tracker = PerformanceTracker::new(repo);

        let missing = Uuid::new_v4();
        assert!(matches!(tracker.record_impression(missing).await, Err(CoreError::NotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_concurrent_impressions_are_not_lost() {
        let (repo, id) = seeded(Counters::default()).await;
        let tracker = PerformanceTracker::new(repo.clone());

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.record_impression(id).await })
            })
            .collect();

        for result in futures_util::future::join_all(handles).await {
            result.expect("task panicked").expect("impression rejected");
        }

        let stored = repo.get_advertisement(id).await.unwrap().unwrap();
        assert_eq!(stored.performance.impressions, 100);
    }

    #[tokio::test]
    async fn test_delivery_respects_window_and_active_flag() {
        let repo = Arc::new(InMemoryAdRepository::default());
        let january = ad("january", vec![Platform::Youtube], at(2024, 1, 1), Some(at(2024, 1, 31)));
        let january_id = january.id;
        repo.create_advertisement(&january).await.unwrap();

        let delivery = AdDelivery::new(repo.clone(), SelectionPolicy::First);

        let picked = delivery.pick(Platform::Youtube, at(2024, 1, 15)).await.unwrap();
        assert_eq!(picked.map(|a| a.id), Some(january_id));
        assert!(delivery.pick(Platform::Youtube, at(2024, 2, 1)).await.unwrap().is_none());
        assert!(delivery.pick(Platform::Instagram, at(2024, 1, 15)).await.unwrap().is_none());

        repo.set_active(january_id, false).await.unwrap();
        assert!(delivery.pick(Platform::Youtube, at(2024, 1, 15)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_policy_uses_store_order() {
        let repo = Arc::new(InMemoryAdRepository::default());
        let first = ad("first", vec![Platform::Instagram], at(2024, 1, 1), None);
        let second = ad("second", vec![Platform::Instagram], at(2024, 1, 1), None);
        repo.create_advertisement(&first).await.unwrap();
        repo.create_advertisement(&second).await.unwrap();

        let delivery = AdDelivery::new(repo.clone(), SelectionPolicy::First);
        let picked = delivery.pick(Platform::Instagram, at(2024, 3, 1)).await.unwrap().unwrap();
        assert_eq!(picked.title, "first");

        let random = AdDelivery::new(repo, SelectionPolicy::Random);
        let picked = random.pick(Platform::Instagram, at(2024, 3, 1)).await.unwrap().unwrap();
        assert!(picked.title == "first" || picked.title == "second");
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let repo = InMemoryAdRepository::default();
        let a = ad("dup", vec![Platform::Youtube], at(2024, 1, 1), None);

        repo.create_advertisement(&a).await.unwrap();
        assert!(repo.create_advertisement(&a).await.is_err());
        assert_eq!(repo.len().await, 1);
    }
}
