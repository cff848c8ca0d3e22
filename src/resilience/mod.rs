//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to dispatch:
//!     → dispatcher.rs (select peer, forward)
//!     → On transport failure: retries.rs bounds (retry same backend after a delay)
//!     → Retry budget spent: mark backend dead, try the next one
//!     → Attempt ceiling or empty pool: 503
//! ```
//!
//! # Design Decisions
//! - Attempt counters travel as an explicit value, not request extensions
//! - Only transport failures are retried; HTTP error statuses pass through
//! - Timeouts per attempt live in the forwarder; the request deadline in middleware

pub mod dispatcher;
pub mod retries;

pub use dispatcher::{DispatchError, RetryDispatcher};
pub use retries::{AttemptState, RetryPolicy};
