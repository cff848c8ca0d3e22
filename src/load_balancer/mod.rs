//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request ready for dispatch
//!     → pool.rs (round-robin from the shared cursor, skip dead backends)
//!     → backend.rs (liveness flag + owned forwarder)
//!     → forwarder.rs (deliver to the backend, report transport failures)
//! ```
//!
//! # Design Decisions
//! - The backend list is fixed after startup; only liveness and the cursor mutate
//! - Cursor and liveness are atomics, so selection never takes a lock
//! - Dead backends are excluded from selection until revived by a health check

pub mod backend;
pub mod forwarder;
pub mod pool;

pub use backend::Backend;
pub use forwarder::{Forward, ForwardError, HttpForwarder};
pub use pool::ServerPool;
