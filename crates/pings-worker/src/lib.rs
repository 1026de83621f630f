//! The pings worker: fetch targets from the coordinator, measure each one,
//! report the results, repeat.

pub mod cancel;
pub mod client;
pub mod control;
pub mod coordinator;
pub mod http;
pub mod retry;
pub mod status;

pub use cancel::CancelToken;
pub use client::PingsClient;
pub use control::{ControlLoop, WorkerError};
pub use coordinator::{Coordinator, CoordinatorError};
pub use http::HttpCoordinator;
pub use retry::{ExponentialBackoff, FixedDelay, RetryPolicy};
pub use status::StatusSurface;
