//! Site schema validation.
//!
//! # Responsibilities
//! - Check names, addresses and ports of a site and its children
//! - Check name uniqueness of farms, listeners and servers
//! - Enforce the single default farm rule (always on, independent of
//!   schema validation)
//!
//! Schema checks run on a normalized site, so auto-assigned `address:port`
//! names take part in the uniqueness checks.

use std::collections::HashSet;

use crate::error::ConfError;
use crate::model::Site;

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

fn check_name(problems: &mut Vec<String>, kind: &str, name: &str) {
    if !is_valid_name(name) {
        problems.push(format!(
            "{} name {:?} must be non-empty and contain only letters, digits, '-', '_', '.' or ':'",
            kind, name
        ));
    }
}

fn check_endpoint(problems: &mut Vec<String>, kind: &str, name: &str, address: &str, port: u16) {
    if address.trim().is_empty() {
        problems.push(format!("{} {}: address is required", kind, name));
    }
    if port == 0 {
        problems.push(format!("{} {}: port must be between 1 and 65535", kind, name));
    }
}

fn check_unique<'a>(
    problems: &mut Vec<String>,
    kind: &str,
    names: impl Iterator<Item = &'a str>,
) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            problems.push(format!("duplicate {} name {}", kind, name));
        }
    }
}

/// Validate the shape of a site, reporting every problem at once.
pub fn validate_site(site: &Site) -> Result<(), ConfError> {
    let mut problems = Vec::new();

    check_name(&mut problems, "site", &site.name);

    for listener in &site.service.listeners {
        check_name(&mut problems, "listener", &listener.name);
        check_endpoint(&mut problems, "listener", &listener.name, &listener.address, listener.port);
    }
    check_unique(
        &mut problems,
        "listener",
        site.service.listeners.iter().map(|l| l.name.as_str()),
    );

    for farm in &site.farms {
        check_name(&mut problems, "farm", &farm.name);
        for server in &farm.servers {
            check_name(&mut problems, "server", &server.name);
            check_endpoint(&mut problems, "server", &server.name, &server.address, server.port);
        }
        check_unique(
            &mut problems,
            "server",
            farm.servers.iter().map(|s| s.name.as_str()),
        );
    }
    check_unique(&mut problems, "farm", site.farms.iter().map(|f| f.name.as_str()));

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfError::Validation(problems.join("; ")))
    }
}

/// Reject a site with more than one default farm.
pub fn ensure_single_default(site: &Site) -> Result<(), ConfError> {
    if site.default_farms().nth(1).is_some() {
        return Err(ConfError::Validation(format!(
            "Multiple default backends found in site: {}",
            site.name
        )));
    }
    Ok(())
}
