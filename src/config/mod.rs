//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → denylists/allowlist frozen into sets by the filters
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Credentials come from the environment, not the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AsnConfig, AttackConfig, FilterConfig, GuardConfig, ListenerConfig, NotifierConfig,
    ObservabilityConfig, OriginConfig, RateLimitConfig, StoreBackend, StoreConfig, TimeoutConfig,
};
