//! # Dispatcher
//!
//! Run work queue and worker pool.
//!
//! Responsibilities:
//! - Accept run ids from boundaries ([`RunQueue`])
//! - Execute them concurrently on N workers ([`RunDispatcher`])
//! - Guarantee at most one active executor per run id ([`RunClaims`])

pub mod claims;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod queue;

pub use claims::{RunClaim, RunClaims};
pub use dispatcher::RunDispatcher;
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use queue::RunQueue;
