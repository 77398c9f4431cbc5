//! REST surface for scheduling, engagement tracking, and the directory.

pub mod rest;
pub mod server;

pub use rest::AppState;
pub use server::{build_router, ApiServer};
