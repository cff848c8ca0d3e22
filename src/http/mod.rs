//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (request ID, buffer body, prepare headers)
//!     → [dispatcher picks backends and retries] (resilience)
//!     → response.rs (503 for terminal dispatch failures)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, ProxyRequest, X_REQUEST_ID};
pub use server::HttpServer;
