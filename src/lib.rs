//! Round-robin HTTP load balancer with health checks and failover.

pub mod config;
pub mod http;
pub mod health;
pub mod load_balancer;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
