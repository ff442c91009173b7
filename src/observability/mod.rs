//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Site calls, reconciler, transaction store produce:
//!     → tracing events (structured, one per primitive mutation at debug)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, pretty or JSON)
//!     → whatever metrics recorder the host installs
//! ```

pub mod logging;
pub mod metrics;
