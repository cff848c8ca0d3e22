//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) and/or command line flags
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once at startup to build the pool
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend pool is fixed for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ensure_valid, read_config, ConfigError};
pub use schema::{
    HealthCheckConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    RetryConfig, TimeoutConfig,
};
pub use validation::{parse_backend_url, validate_config, ValidationError};
