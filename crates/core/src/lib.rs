pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod history;
pub mod types;

pub use config::AppConfig;
pub use error::{SmartReachError, SmartReachResult};
