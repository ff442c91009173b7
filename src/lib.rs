//! Site reconciliation for reverse-proxy configuration.
//!
//! Frontends, backends, binds, servers and switching rules are exposed as
//! one aggregate, the Site. Changes to a Site are diffed against the stored
//! primitives and applied as a minimal list of primitive operations inside
//! one transaction.

pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod observability;
pub mod site;
pub mod transaction;

pub use config::schema::ManagerConfig;
pub use document::{Document, Primitives};
pub use error::{CompositeError, ConfError};
pub use model::{Farm, Service, Site, UseAs};
pub use site::SiteClient;
pub use transaction::{Scope, Storage, Transactions};
