pub mod events;

pub use events::{AdServedEvent, AdTrackedEvent};
