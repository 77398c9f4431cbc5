//! Send-time optimization and dispatch — window arithmetic, per-recipient
//! estimation, message personalization, and queue submission.

pub mod estimator;
pub mod personalize;
pub mod queue;
pub mod scheduler;
pub mod window;

pub use estimator::OptimalTimeEstimator;
pub use personalize::Personalizer;
pub use queue::{DeliveryQueue, InMemoryDeliveryQueue, SubmitAck};
pub use scheduler::{DispatchScheduler, ScheduleContext};
pub use window::{CampaignWindow, TimeWindowConverter};
