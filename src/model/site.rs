//! The Site aggregate.
//!
//! A Site is one frontend (its [`Service`]) plus the backends attached to it
//! (its [`Farm`]s). It has no stored form of its own: it is composed from
//! primitives on read and decomposed into primitives on write.

use serde::{Deserialize, Serialize};

use crate::model::primitives::{
    Backend, Balance, Bind, Cond, Forwardfor, Frontend, HttpConnectionMode, Mode, Server,
};

/// How a farm is attached to the site's frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UseAs {
    /// Target of the frontend's `default_backend`.
    Default,
    /// Target of a `use_backend` rule.
    Conditional,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Site {
    pub name: String,
    pub service: Service,
    pub farms: Vec<Farm>,
}

/// Public-facing part of a site, stored on the frontend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Service {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxconn: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_connection_mode: Option<HttpConnectionMode>,
    pub listeners: Vec<Bind>,
}

/// A backend and its attachment to the site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Farm {
    pub name: String,
    pub use_as: UseAs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<Cond>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond_test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwardfor: Option<Forwardfor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,
    #[serde(default)]
    pub servers: Vec<Server>,
}

impl Site {
    /// Give every unnamed listener and server its `address:port` name.
    pub fn normalize(&mut self) {
        self.service.listeners.iter_mut().for_each(Bind::ensure_name);
        for farm in &mut self.farms {
            farm.servers.iter_mut().for_each(Server::ensure_name);
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    pub fn farm(&self, name: &str) -> Option<&Farm> {
        self.farms.iter().find(|f| f.name == name)
    }

    /// Farms attached as the default backend, in declaration order.
    pub fn default_farms(&self) -> impl Iterator<Item = &Farm> {
        self.farms.iter().filter(|f| f.use_as == UseAs::Default)
    }
}

impl Service {
    /// Frontend section named `name` carrying this service's fields.
    pub fn to_frontend(&self, name: &str) -> Frontend {
        let mut frontend = Frontend {
            name: name.to_string(),
            ..Frontend::default()
        };
        self.apply_to(&mut frontend);
        frontend
    }

    /// Overwrite the service-owned fields of `frontend`, leaving the rest.
    pub fn apply_to(&self, frontend: &mut Frontend) {
        frontend.mode = self.mode;
        frontend.maxconn = self.maxconn;
        frontend.http_connection_mode = self.http_connection_mode;
    }

    pub fn from_frontend(frontend: &Frontend, listeners: Vec<Bind>) -> Self {
        Self {
            mode: frontend.mode,
            maxconn: frontend.maxconn,
            http_connection_mode: frontend.http_connection_mode,
            listeners,
        }
    }

    /// Equality of the fields stored on the frontend itself.
    pub fn frontend_fields_eq(&self, other: &Service) -> bool {
        self.mode == other.mode
            && self.maxconn == other.maxconn
            && self.http_connection_mode == other.http_connection_mode
    }
}

impl Farm {
    pub fn new(name: impl Into<String>, use_as: UseAs) -> Self {
        Self {
            name: name.into(),
            use_as,
            cond: None,
            cond_test: None,
            mode: None,
            forwardfor: None,
            balance: None,
            servers: Vec::new(),
        }
    }

    /// Rebuild a farm from its backend, attachment and servers.
    pub fn from_backend(
        backend: &Backend,
        use_as: UseAs,
        cond: Option<Cond>,
        cond_test: Option<String>,
        servers: Vec<Server>,
    ) -> Self {
        Self {
            name: backend.name.clone(),
            use_as,
            cond,
            cond_test,
            mode: backend.mode,
            forwardfor: backend.forwardfor.clone(),
            balance: backend.balance.clone(),
            servers,
        }
    }

    pub fn to_backend(&self) -> Backend {
        let mut backend = Backend {
            name: self.name.clone(),
            ..Backend::default()
        };
        self.apply_to(&mut backend);
        backend
    }

    pub fn apply_to(&self, backend: &mut Backend) {
        backend.mode = self.mode;
        backend.forwardfor = self.forwardfor.clone();
        backend.balance = self.balance.clone();
    }

    /// Equality of the fields stored on the backend section.
    pub fn backend_fields_eq(&self, other: &Farm) -> bool {
        self.mode == other.mode
            && self.forwardfor == other.forwardfor
            && self.balance == other.balance
    }

    pub fn predicate_eq(&self, other: &Farm) -> bool {
        self.cond == other.cond && self.cond_test == other.cond_test
    }

    /// True when both `cond` and a non-empty `cond_test` are set.
    pub fn has_predicate(&self) -> bool {
        self.cond.is_some() && self.cond_test.as_deref().is_some_and(|t| !t.is_empty())
    }
}
