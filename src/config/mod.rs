//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ManagerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Without a config file the defaults apply

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ManagerConfig;
pub use schema::ObservabilityConfig;
pub use schema::StorageConfig;
pub use schema::ValidationConfig;
