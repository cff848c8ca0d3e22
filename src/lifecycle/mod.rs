//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build pool → Start health monitor → Serve
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → trigger → health monitor exits, server drains → Exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::os_signal;
