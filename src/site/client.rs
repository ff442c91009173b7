//! Site-level operations.
//!
//! # Responsibilities
//! - Expose get/list/create/edit/delete of sites
//! - Run every change inside a scoped transaction
//! - Apply schema validation when enabled
//!
//! # Design Decisions
//! - The current site is always read from the working copy being changed
//! - Implicit transactions are committed on success and discarded on any
//!   error; explicit ones are only written back, never committed here

use crate::document::Document;
use crate::error::ConfError;
use crate::model::Site;
use crate::observability::metrics;
use crate::site::reader::{read_site, read_sites};
use crate::site::reconciler::Reconciler;
use crate::site::validation::{ensure_single_default, validate_site};
use crate::transaction::{Scope, Transactions};

/// Site API over a transaction coordinator.
#[derive(Debug)]
pub struct SiteClient<T: Transactions> {
    transactions: T,
    use_validation: bool,
}

impl<T: Transactions> SiteClient<T> {
    /// Create a client with schema validation enabled.
    pub fn new(transactions: T) -> Self {
        Self {
            transactions,
            use_validation: true,
        }
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.use_validation = enabled;
        self
    }

    pub fn transactions(&self) -> &T {
        &self.transactions
    }

    /// Configuration version and every readable site.
    pub fn get_sites(&self, transaction: Option<&str>) -> Result<(i64, Vec<Site>), ConfError> {
        let (version, document) = self.transactions.snapshot(transaction)?;
        Ok((version, read_sites(&document)))
    }

    /// Configuration version and the site `name`.
    pub fn get_site(
        &self,
        name: &str,
        transaction: Option<&str>,
    ) -> Result<(i64, Site), ConfError> {
        let (version, document) = self.transactions.snapshot(transaction)?;
        Ok((version, read_site(&document, name)?))
    }

    pub fn create_site(&self, site: &Site, scope: &Scope) -> Result<(), ConfError> {
        tracing::info!(site = %site.name, ?scope, "Creating site");
        let result = self
            .prepare(site.clone())
            .and_then(|site| self.in_transaction(scope, |doc| Reconciler::new(doc).create(&site)));
        self.finish("create", &site.name, result)
    }

    pub fn edit_site(&self, name: &str, site: &Site, scope: &Scope) -> Result<(), ConfError> {
        tracing::info!(site = %name, ?scope, "Editing site");
        let mut site = site.clone();
        if site.name.is_empty() {
            site.name = name.to_string();
        }
        let result = self
            .prepare(site)
            .and_then(|site| self.in_transaction(scope, |doc| Reconciler::new(doc).edit(name, &site)));
        self.finish("edit", name, result)
    }

    pub fn delete_site(&self, name: &str, scope: &Scope) -> Result<(), ConfError> {
        tracing::info!(site = %name, ?scope, "Deleting site");
        let result = self.in_transaction(scope, |doc| Reconciler::new(doc).delete(name));
        self.finish("delete", name, result)
    }

    /// Open the working copy for `scope`, run `work` on it, then save it on
    /// success or abandon it on error.
    pub fn in_transaction<R, F>(&self, scope: &Scope, work: F) -> Result<R, ConfError>
    where
        F: FnOnce(&mut Document) -> Result<R, ConfError>,
    {
        let mut working = self.transactions.load_for_change(scope)?;
        match work(&mut working.document) {
            Ok(value) => {
                self.transactions.save(working)?;
                Ok(value)
            }
            Err(err) => {
                let transaction = working.transaction_id().to_string();
                if let Err(abandon_err) = self.transactions.abandon(working) {
                    tracing::error!(
                        transaction = %transaction,
                        error = %abandon_err,
                        "Failed to release transaction after error"
                    );
                }
                Err(err)
            }
        }
    }

    /// Normalize names, enforce the single default rule and validate.
    fn prepare(&self, site: Site) -> Result<Site, ConfError> {
        let site = site.normalized();
        ensure_single_default(&site)?;
        if self.use_validation {
            validate_site(&site)?;
        }
        Ok(site)
    }

    fn finish(
        &self,
        operation: &'static str,
        site: &str,
        result: Result<(), ConfError>,
    ) -> Result<(), ConfError> {
        metrics::record_site_operation(operation, result.is_ok());
        match &result {
            Ok(()) => tracing::info!(site = %site, operation, "Site operation succeeded"),
            Err(e) => tracing::warn!(site = %site, operation, error = %e, "Site operation failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bind, Service};
    use crate::transaction::Storage;

    fn site(name: &str) -> Site {
        Site {
            name: name.into(),
            service: Service {
                listeners: vec![Bind {
                    name: String::new(),
                    address: "0.0.0.0".into(),
                    port: 80,
                }],
                ..Service::default()
            },
            farms: Vec::new(),
        }
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let client = SiteClient::new(Storage::in_memory());
        let err = client.create_site(&site("bad name"), &Scope::Version(1)).unwrap_err();
        assert!(matches!(err, ConfError::Validation(_)));
        assert_eq!(client.transactions().version(None).unwrap(), 1);

        let client = client.with_validation(false);
        client.create_site(&site("bad name"), &Scope::Version(1)).unwrap();
        assert_eq!(client.get_sites(None).unwrap().1.len(), 1);
    }

    #[test]
    fn test_in_transaction_discards_on_error() {
        let client = SiteClient::new(Storage::in_memory());
        let result: Result<(), ConfError> = client.in_transaction(&Scope::Version(1), |doc| {
            doc.frontends.push(Default::default());
            Err(ConfError::Validation("boom".into()))
        });
        assert!(result.is_err());
        assert!(client.transactions().document(None).unwrap().frontends.is_empty());
        assert!(client.transactions().transactions().is_empty());
    }

    #[test]
    fn test_edit_fills_in_missing_name() {
        let client = SiteClient::new(Storage::in_memory());
        client.create_site(&site("web"), &Scope::Version(1)).unwrap();

        let mut desired = site("");
        desired.service.maxconn = Some(10);
        client.edit_site("web", &desired, &Scope::Version(2)).unwrap();

        let (version, current) = client.get_site("web", None).unwrap();
        assert_eq!(version, 3);
        assert_eq!(current.service.maxconn, Some(10));
    }
}
