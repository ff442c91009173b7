//! Configuration data model.
//!
//! # Layers
//! ```text
//! Site (aggregate, composed on read)
//!     → Service  ─ Frontend + Bind[]
//!     → Farm[]   ─ Backend + Server[]
//!                  + attachment: Frontend.default_backend
//!                                or BackendSwitchingRule
//! ```
//!
//! # Design Decisions
//! - Every type derives `PartialEq`; diffing compares values directly
//! - Unnamed binds and servers take the name `address:port`
//! - Collections are plain vectors looked up by name

pub mod primitives;
pub mod site;

pub use primitives::{
    Backend, BackendSwitchingRule, Balance, BalanceAlgorithm, Bind, Cond, Forwardfor, Frontend,
    HttpConnectionMode, Mode, Server,
};
pub use site::{Farm, Service, Site, UseAs};
