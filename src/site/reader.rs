//! Site reconstruction from primitives.
//!
//! # Responsibilities
//! - Compose a Site from a frontend, its binds and its attachments
//! - Hydrate each attached backend with its servers
//!
//! # Design Decisions
//! - Best effort below the frontend: a default pointer or rule naming a
//!   backend that no longer exists is skipped, not reported
//! - The default farm comes first, conditional farms follow in rule order

use crate::document::Primitives;
use crate::error::ConfError;
use crate::model::{Cond, Farm, Service, Site, UseAs};

/// Read the site built on frontend `name`.
pub fn read_site<P: Primitives + ?Sized>(primitives: &P, name: &str) -> Result<Site, ConfError> {
    let frontend = primitives.get_frontend(name).map_err(|e| {
        if e.is_not_found() {
            ConfError::ObjectDoesNotExist(format!("Site {} does not exist", name))
        } else {
            e
        }
    })?;

    let listeners = primitives.get_binds(name).unwrap_or_default();
    let mut site = Site {
        name: name.to_string(),
        service: Service::from_frontend(&frontend, listeners),
        farms: Vec::new(),
    };

    if let Some(default_backend) = frontend.default_backend.as_deref().filter(|b| !b.is_empty()) {
        site.farms
            .extend(read_farm(primitives, default_backend, UseAs::Default, None, None));
    }

    let rules = primitives.get_backend_switching_rules(name).unwrap_or_default();
    for rule in rules {
        site.farms.extend(read_farm(
            primitives,
            &rule.name,
            UseAs::Conditional,
            rule.cond,
            rule.cond_test,
        ));
    }

    Ok(site)
}

fn read_farm<P: Primitives + ?Sized>(
    primitives: &P,
    name: &str,
    use_as: UseAs,
    cond: Option<Cond>,
    cond_test: Option<String>,
) -> Option<Farm> {
    let backend = match primitives.get_backend(name) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::debug!(backend = %name, error = %e, "Skipping unresolvable farm");
            return None;
        }
    };
    let servers = primitives.get_servers(name).unwrap_or_default();
    Some(Farm::from_backend(&backend, use_as, cond, cond_test, servers))
}

/// Read every site, in frontend order. Unreadable sites are left out.
pub fn read_sites<P: Primitives + ?Sized>(primitives: &P) -> Vec<Site> {
    primitives
        .frontend_names()
        .iter()
        .filter_map(|name| read_site(primitives, name).ok())
        .collect()
}
