//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → ServerPool::health_check
//!     → probe.rs (TCP connect with timeout, per backend, in order)
//!     → Backend liveness updated
//! ```
//!
//! # Design Decisions
//! - Pure reachability: a successful connect means alive, anything else dead
//! - Probe failures are state updates, never errors
//! - One cycle at a time; the loop awaits each cycle before the next tick

pub mod active;
pub mod probe;

pub use active::HealthMonitor;
pub use probe::{Probe, TcpProbe};
