//! Shared fixtures for integration tests.

use site_reconciler::model::{Bind, Cond, Server};
use site_reconciler::{Farm, Service, Site, SiteClient, Storage, UseAs};

/// Client over a fresh in-memory store at version 1.
pub fn client() -> SiteClient<Storage> {
    SiteClient::new(Storage::in_memory())
}

pub fn listener(address: &str, port: u16) -> Bind {
    Bind {
        name: String::new(),
        address: address.into(),
        port,
    }
}

pub fn server(address: &str, port: u16) -> Server {
    Server {
        name: String::new(),
        address: address.into(),
        port,
    }
}

pub fn default_farm(name: &str, servers: Vec<Server>) -> Farm {
    Farm {
        servers,
        ..Farm::new(name, UseAs::Default)
    }
}

pub fn conditional_farm(name: &str, test: &str, servers: Vec<Server>) -> Farm {
    Farm {
        cond: Some(Cond::If),
        cond_test: Some(test.into()),
        servers,
        ..Farm::new(name, UseAs::Conditional)
    }
}

/// Site listening on 0.0.0.0:80 with a single default farm `app1`.
pub fn web_site(name: &str) -> Site {
    Site {
        name: name.into(),
        service: Service {
            listeners: vec![listener("0.0.0.0", 80)],
            ..Service::default()
        },
        farms: vec![default_farm("app1", vec![server("10.0.0.1", 8080)])],
    }
}
