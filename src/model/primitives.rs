//! Primitive configuration objects.
//!
//! These mirror the sections and directives of the proxy configuration:
//! frontends with their binds and backend switching rules, backends with
//! their servers. All types derive Serde traits so they can be stored in the
//! document and exchanged as JSON.

use serde::{Deserialize, Serialize};

/// Proxy mode of a frontend or backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Http,
    Tcp,
}

/// HTTP connection handling of a frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum HttpConnectionMode {
    #[serde(rename = "http-tunnel")]
    HttpTunnel,
    #[serde(rename = "httpclose")]
    HttpClose,
    #[serde(rename = "forceclose")]
    ForceClose,
    #[serde(rename = "http-server-close")]
    HttpServerClose,
    #[serde(rename = "http-keep-alive")]
    HttpKeepAlive,
}

/// Condition keyword of a routing predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cond {
    If,
    Unless,
}

/// Load balancing algorithm of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum BalanceAlgorithm {
    #[serde(rename = "roundrobin")]
    RoundRobin,
    #[serde(rename = "static-rr")]
    StaticRoundRobin,
    #[serde(rename = "leastconn")]
    LeastConn,
    #[serde(rename = "first")]
    First,
    #[serde(rename = "source")]
    Source,
    #[serde(rename = "uri")]
    Uri,
    #[serde(rename = "url_param")]
    UrlParam,
    #[serde(rename = "hdr")]
    Hdr,
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "rdp-cookie")]
    RdpCookie,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Balance {
    pub algorithm: BalanceAlgorithm,

    /// Algorithm arguments (header name, url parameter, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

/// `option forwardfor` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Forwardfor {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub except: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub ifnone: bool,
}

/// A frontend section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Frontend {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxconn: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_connection_mode: Option<HttpConnectionMode>,

    /// Name of the backend used when no switching rule matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_backend: Option<String>,
}

/// A backend section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Backend {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwardfor: Option<Forwardfor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,
}

/// A `bind` line of a frontend. Sites call these listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Bind {
    /// Empty until named; see [`Bind::default_name`].
    pub name: String,
    pub address: String,
    pub port: u16,
}

/// A `server` line of a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Server {
    /// Empty until named; see [`Server::default_name`].
    pub name: String,
    pub address: String,
    pub port: u16,
}

/// A `use_backend` rule of a frontend, keyed by its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSwitchingRule {
    /// Target backend name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cond: Option<Cond>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cond_test: Option<String>,
}

fn address_port(address: &str, port: u16) -> String {
    format!("{}:{}", address, port)
}

impl Bind {
    /// `address:port`, the name given to unnamed binds.
    pub fn default_name(&self) -> String {
        address_port(&self.address, self.port)
    }

    /// Fill in the name if it is empty.
    pub fn ensure_name(&mut self) {
        if self.name.is_empty() {
            self.name = self.default_name();
        }
    }
}

impl Server {
    /// `address:port`, the name given to unnamed servers.
    pub fn default_name(&self) -> String {
        address_port(&self.address, self.port)
    }

    /// Fill in the name if it is empty.
    pub fn ensure_name(&mut self) {
        if self.name.is_empty() {
            self.name = self.default_name();
        }
    }
}
