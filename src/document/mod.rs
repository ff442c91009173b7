//! The configuration document.
//!
//! # Data Flow
//! ```text
//! Transaction store
//!     → Document (working copy, owned by one call)
//!     → primitives.rs (per-object create/get/edit/delete)
//!     → back to the store on save
//! ```
//!
//! # Design Decisions
//! - Sections keep document order; lookups are linear by name
//! - Child objects live inside their parent section, so deleting a
//!   frontend or backend drops its binds, rules or servers with it
//! - Rendering to proxy configuration text is out of scope

pub mod primitives;

use serde::{Deserialize, Serialize};

use crate::model::{Backend, BackendSwitchingRule, Bind, Frontend, Server};

pub use primitives::Primitives;

/// A frontend section with its child objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontendSection {
    pub frontend: Frontend,
    pub binds: Vec<Bind>,
    pub backend_switching_rules: Vec<BackendSwitchingRule>,
}

/// A backend section with its servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSection {
    pub backend: Backend,
    pub servers: Vec<Server>,
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Document {
    pub frontends: Vec<FrontendSection>,
    pub backends: Vec<BackendSection>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frontend_section(&self, name: &str) -> Option<&FrontendSection> {
        self.frontends.iter().find(|s| s.frontend.name == name)
    }

    pub fn frontend_section_mut(&mut self, name: &str) -> Option<&mut FrontendSection> {
        self.frontends.iter_mut().find(|s| s.frontend.name == name)
    }

    pub fn backend_section(&self, name: &str) -> Option<&BackendSection> {
        self.backends.iter().find(|s| s.backend.name == name)
    }

    pub fn backend_section_mut(&mut self, name: &str) -> Option<&mut BackendSection> {
        self.backends.iter_mut().find(|s| s.backend.name == name)
    }
}
