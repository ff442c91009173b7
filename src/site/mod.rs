//! Site management subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (desired Site, Scope)
//!     → client.rs (validation, scoped transaction)
//!     → reconciler.rs (diff desired vs current)
//!         → reader.rs (current Site from the working copy)
//!         → relations.rs (default pointer / switching rules)
//!         → Primitives (create/edit/delete per object)
//!     → Transactions (save & commit, or abandon)
//! ```
//!
//! # Design Decisions
//! - A Site is never stored; it is composed from primitives on every read
//! - All primitive failures of a call are reported together
//! - A second default farm is rejected before anything is changed

pub mod client;
pub mod reader;
pub mod reconciler;
pub mod relations;
pub mod validation;

pub use client::SiteClient;
pub use reader::{read_site, read_sites};
pub use reconciler::Reconciler;
