//! Engagement feedback loop — record store, open/click ingestion, and the
//! autofill start-time helper.

pub mod autofill;
pub mod store;
pub mod tracker;

pub use autofill::{AutofillEngine, StartTimeSuggestion};
pub use store::EngagementStore;
pub use tracker::{ClickOutcome, EngagementTracker, OpenAck};
