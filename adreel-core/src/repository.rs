use async_trait::async_trait;
use uuid::Uuid;

use crate::advertisement::{Advertisement, Platform};
use crate::performance::{Performance, TrackingEvent};
use crate::CoreResult;

/// Repository trait for advertisement data access
#[async_trait]
pub trait AdRepository: Send + Sync {
    async fn create_advertisement(&self, ad: &Advertisement) -> CoreResult<()>;

    async fn get_advertisement(&self, id: Uuid) -> CoreResult<Option<Advertisement>>;

    /// All advertisements in store order, optionally restricted to one platform.
    async fn list_advertisements(&self, platform: Option<Platform>) -> CoreResult<Vec<Advertisement>>;

    /// A superset of the ads eligible on `platform`, in store order.
    ///
    /// Implementations may narrow by platform and active flag; the caller
    /// still runs the full eligibility predicate.
    async fn list_delivery_candidates(&self, platform: Platform) -> CoreResult<Vec<Advertisement>> {
        self.list_advertisements(Some(platform)).await
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> CoreResult<Option<Advertisement>>;

    /// Atomically applies one tracking event.
    ///
    /// Fails with `NotFound` for unknown ids and `OrderingViolation` (counters
    /// unchanged) when the funnel order would break.
    async fn record_event(&self, id: Uuid, event: TrackingEvent) -> CoreResult<Performance>;
}
