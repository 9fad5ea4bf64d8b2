//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → command line overrides applied in main
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; queue capacity is fixed for the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CodecConfig, LifecycleConfig, ListenerConfig, ObservabilityConfig, QueueConfig,
    RawListenerConfig, RelayConfig,
};
pub use validation::{validate_config, ValidationError};
