//! Frontend/backend attachments.
//!
//! A backend is attached to a frontend either as its `default_backend` or
//! through a `use_backend` switching rule. These helpers keep the two
//! representations consistent when farms are added, moved or removed.
//!
//! Calls that would not change anything issue no primitive edit.

use crate::document::Primitives;
use crate::error::ConfError;
use crate::model::{BackendSwitchingRule, Cond, Farm, UseAs};

/// Point the frontend's default backend at `backend`.
pub fn attach_default<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
    backend: &str,
) -> Result<(), ConfError> {
    let mut section = primitives.get_frontend(frontend)?;
    if section.default_backend.as_deref() == Some(backend) {
        return Ok(());
    }
    section.default_backend = Some(backend.to_string());
    primitives.edit_frontend(frontend, &section)
}

/// Clear the frontend's default backend.
pub fn detach_default<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
) -> Result<(), ConfError> {
    let mut section = primitives.get_frontend(frontend)?;
    if section.default_backend.is_none() {
        return Ok(());
    }
    section.default_backend = None;
    primitives.edit_frontend(frontend, &section)
}

/// Clear the default backend only while it still names `backend`.
fn detach_default_of<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
    backend: &str,
) -> Result<(), ConfError> {
    let section = primitives.get_frontend(frontend)?;
    if section.default_backend.as_deref() != Some(backend) {
        return Ok(());
    }
    detach_default(primitives, frontend)
}

/// Append a switching rule sending matching traffic to `backend`.
pub fn attach_conditional<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
    backend: &str,
    cond: Option<Cond>,
    cond_test: Option<&str>,
) -> Result<(), ConfError> {
    let (cond, cond_test) = match (cond, cond_test) {
        (Some(cond), Some(test)) if !test.is_empty() => (cond, test),
        _ => return Err(ConfError::MissingCondition(backend.to_string())),
    };

    let position = primitives.get_backend_switching_rules(frontend)?.len();
    let rule = BackendSwitchingRule {
        name: backend.to_string(),
        cond: Some(cond),
        cond_test: Some(cond_test.to_string()),
    };
    primitives.create_backend_switching_rule(position, frontend, &rule)
}

/// Remove the first switching rule targeting `backend`, if there is one.
pub fn detach_conditional<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
    backend: &str,
) -> Result<(), ConfError> {
    let rules = primitives.get_backend_switching_rules(frontend)?;
    match rules.iter().position(|r| r.name == backend) {
        Some(index) => primitives.delete_backend_switching_rule(index, frontend),
        None => Ok(()),
    }
}

/// Rewrite the predicate of the farm's existing rule in place, keeping its
/// evaluation position. Appends a rule if none targets the farm yet.
pub fn retarget_conditional<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
    farm: &Farm,
) -> Result<(), ConfError> {
    if !farm.has_predicate() {
        return Err(ConfError::MissingCondition(farm.name.clone()));
    }

    let rules = primitives.get_backend_switching_rules(frontend)?;
    match rules.iter().position(|r| r.name == farm.name) {
        Some(index) => {
            let rule = BackendSwitchingRule {
                name: farm.name.clone(),
                cond: farm.cond,
                cond_test: farm.cond_test.clone(),
            };
            primitives.edit_backend_switching_rule(index, frontend, &rule)
        }
        None => attach_conditional(
            primitives,
            frontend,
            &farm.name,
            farm.cond,
            farm.cond_test.as_deref(),
        ),
    }
}

/// Attach `farm` the way its `use_as` says.
pub fn attach<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
    farm: &Farm,
) -> Result<(), ConfError> {
    match farm.use_as {
        UseAs::Default => attach_default(primitives, frontend, &farm.name),
        UseAs::Conditional => attach_conditional(
            primitives,
            frontend,
            &farm.name,
            farm.cond,
            farm.cond_test.as_deref(),
        ),
    }
}

/// Remove whatever attachment `farm` has under `use_as`.
pub fn detach<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
    farm_name: &str,
    use_as: UseAs,
) -> Result<(), ConfError> {
    match use_as {
        UseAs::Default => detach_default_of(primitives, frontend, farm_name),
        UseAs::Conditional => detach_conditional(primitives, frontend, farm_name),
    }
}

/// Move `farm` from its `previous` attachment mode to its current one.
///
/// The old attachment is removed first; if that fails the new one is not
/// created, so the farm never ends up attached twice.
pub fn reattach<P: Primitives + ?Sized>(
    primitives: &mut P,
    frontend: &str,
    farm: &Farm,
    previous: UseAs,
) -> Result<(), ConfError> {
    detach(primitives, frontend, &farm.name, previous)?;
    attach(primitives, frontend, farm)
}
