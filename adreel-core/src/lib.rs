pub mod advertisement;
pub mod delivery;
pub mod eligibility;
pub mod performance;
pub mod repository;
pub mod selection;

pub use advertisement::{Advertisement, Advertiser, AgeRange, NewAdvertisement, Placement, Platform, Scheduling, TargetAudience};
pub use delivery::{AdDelivery, PerformanceTracker};
pub use eligibility::{filter_eligible, filter_eligible_now, is_eligible};
pub use performance::{Counters, EngagementWeights, OrderingViolation, Performance, TrackingEvent};
pub use repository::AdRepository;
pub use selection::SelectionPolicy;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Advertisement not found: {0}")]
    NotFound(Uuid),
    #[error("Ordering violation: {violation}")]
    OrderingViolation {
        violation: OrderingViolation,
        /// Counters as they stand after the rejected update (i.e. unchanged).
        performance: Performance,
    },
    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
