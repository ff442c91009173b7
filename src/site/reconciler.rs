//! Site diff/apply engine.
//!
//! # Responsibilities
//! - Translate site create/edit/delete into primitive operations
//! - Keep attachments consistent through the relation helpers
//! - Collect every primitive failure of a pass into one composite error
//!
//! # Design Decisions
//! - Matching between desired and current objects is always by name
//! - Objects are created before they are attached, and detached before
//!   they are deleted
//! - Primitive failures never stop the pass; business-rule violations
//!   (a second default farm, a renamed site) abort before any mutation
//! - Only objects that differ are touched, so re-applying the current
//!   state issues no mutation

use crate::document::Primitives;
use crate::error::{CompositeError, ConfError};
use crate::model::{Bind, Farm, Server, Service, Site, UseAs};
use crate::observability::metrics;
use crate::site::relations;
use crate::site::reader::read_site;
use crate::site::validation::ensure_single_default;

/// One reconciliation pass over a working copy.
pub struct Reconciler<'a, P: Primitives + ?Sized> {
    primitives: &'a mut P,
    errors: CompositeError,
}

impl<'a, P: Primitives + ?Sized> Reconciler<'a, P> {
    pub fn new(primitives: &'a mut P) -> Self {
        Self {
            primitives,
            errors: CompositeError::new(),
        }
    }

    fn record(&mut self, operation: &'static str, target: &str, result: Result<(), ConfError>) {
        match result {
            Ok(()) => tracing::debug!(operation, target = %target, "Applied"),
            Err(e) => {
                tracing::warn!(operation, target = %target, error = %e, "Primitive operation failed");
                metrics::record_primitive_failure(operation);
                self.errors.push(e);
            }
        }
    }

    /// Create `site` from scratch.
    pub fn create(mut self, site: &Site) -> Result<(), ConfError> {
        let site = site.clone().normalized();
        ensure_single_default(&site)?;

        let frontend = site.service.to_frontend(&site.name);
        let result = self.primitives.create_frontend(&frontend);
        self.record("create_frontend", &site.name, result);

        for listener in &site.service.listeners {
            let result = self.primitives.create_bind(&site.name, listener);
            self.record("create_bind", &listener.name, result);
        }

        for farm in &site.farms {
            self.add_farm(&site.name, farm);
        }

        self.errors.into_result()
    }

    /// Bring site `name` to the `desired` state.
    pub fn edit(mut self, name: &str, desired: &Site) -> Result<(), ConfError> {
        let mut desired = desired.clone().normalized();
        if desired.name.is_empty() {
            desired.name = name.to_string();
        } else if desired.name != name {
            return Err(ConfError::Validation(format!(
                "site {} cannot be renamed to {}",
                name, desired.name
            )));
        }
        ensure_single_default(&desired)?;

        let current = read_site(&*self.primitives, name)?;

        if current.service != desired.service {
            self.reconcile_service(name, &current.service, &desired.service);
        }

        if current.farms != desired.farms {
            for farm in &desired.farms {
                match current.farm(&farm.name) {
                    None => self.add_farm(name, farm),
                    Some(existing) if existing != farm => self.update_farm(name, existing, farm),
                    Some(_) => {}
                }
            }
            for farm in &current.farms {
                if desired.farm(&farm.name).is_none() {
                    self.remove_farm(name, farm);
                }
            }
        }

        if desired.default_farms().next().is_none() {
            let result = relations::detach_default(&mut *self.primitives, name);
            self.record("detach_default", name, result);
        }

        self.errors.into_result()
    }

    /// Delete site `name`: its frontend and every farm's backend.
    pub fn delete(mut self, name: &str) -> Result<(), ConfError> {
        let site = read_site(&*self.primitives, name)?;

        let result = self.primitives.delete_frontend(name);
        self.record("delete_frontend", name, result);

        for farm in &site.farms {
            let result = self.primitives.delete_backend(&farm.name);
            self.record("delete_backend", &farm.name, result);
        }

        self.errors.into_result()
    }

    fn reconcile_service(&mut self, frontend: &str, current: &Service, desired: &Service) {
        if !desired.frontend_fields_eq(current) {
            let result = self.primitives.get_frontend(frontend).and_then(|mut section| {
                desired.apply_to(&mut section);
                self.primitives.edit_frontend(frontend, &section)
            });
            self.record("edit_frontend", frontend, result);
        }

        if current.listeners != desired.listeners {
            self.reconcile_listeners(frontend, &current.listeners, &desired.listeners);
        }
    }

    fn reconcile_listeners(&mut self, frontend: &str, current: &[Bind], desired: &[Bind]) {
        for listener in desired {
            match current.iter().find(|l| l.name == listener.name) {
                Some(existing) if existing != listener => {
                    let result = self.primitives.edit_bind(&existing.name, frontend, listener);
                    self.record("edit_bind", &listener.name, result);
                }
                Some(_) => {}
                None => {
                    let result = self.primitives.create_bind(frontend, listener);
                    self.record("create_bind", &listener.name, result);
                }
            }
        }
        for existing in current {
            if !desired.iter().any(|l| l.name == existing.name) {
                let result = self.primitives.delete_bind(&existing.name, frontend);
                self.record("delete_bind", &existing.name, result);
            }
        }
    }

    fn add_farm(&mut self, frontend: &str, farm: &Farm) {
        let result = self.primitives.create_backend(&farm.to_backend());
        self.record("create_backend", &farm.name, result);

        for server in &farm.servers {
            let result = self.primitives.create_server(&farm.name, server);
            self.record("create_server", &server.name, result);
        }

        let result = relations::attach(&mut *self.primitives, frontend, farm);
        self.record("attach", &farm.name, result);
    }

    fn update_farm(&mut self, frontend: &str, current: &Farm, desired: &Farm) {
        if current.use_as != desired.use_as {
            let result = relations::reattach(&mut *self.primitives, frontend, desired, current.use_as);
            self.record("reattach", &desired.name, result);
        } else if desired.use_as == UseAs::Conditional && !desired.predicate_eq(current) {
            let result = relations::retarget_conditional(&mut *self.primitives, frontend, desired);
            self.record("retarget", &desired.name, result);
        }

        if !desired.backend_fields_eq(current) {
            let result = self.primitives.get_backend(&desired.name).and_then(|mut backend| {
                desired.apply_to(&mut backend);
                self.primitives.edit_backend(&desired.name, &backend)
            });
            self.record("edit_backend", &desired.name, result);
        }

        if current.servers != desired.servers {
            self.reconcile_servers(&desired.name, &current.servers, &desired.servers);
        }
    }

    fn reconcile_servers(&mut self, backend: &str, current: &[Server], desired: &[Server]) {
        for server in desired {
            match current.iter().find(|s| s.name == server.name) {
                Some(existing) if existing != server => {
                    let result = self.primitives.edit_server(&existing.name, backend, server);
                    self.record("edit_server", &server.name, result);
                }
                Some(_) => {}
                None => {
                    let result = self.primitives.create_server(backend, server);
                    self.record("create_server", &server.name, result);
                }
            }
        }
        for existing in current {
            if !desired.iter().any(|s| s.name == existing.name) {
                let result = self.primitives.delete_server(&existing.name, backend);
                self.record("delete_server", &existing.name, result);
            }
        }
    }

    fn remove_farm(&mut self, frontend: &str, farm: &Farm) {
        let result = relations::detach(&mut *self.primitives, frontend, &farm.name, farm.use_as);
        self.record("detach", &farm.name, result);

        let result = self.primitives.delete_backend(&farm.name);
        self.record("delete_backend", &farm.name, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::model::{
        Backend, BackendSwitchingRule, Balance, BalanceAlgorithm, Cond, Frontend, Mode,
    };

    /// Primitives wrapper logging every mutating call.
    #[derive(Default)]
    struct Recorder {
        doc: Document,
        mutations: Vec<String>,
    }

    impl Recorder {
        fn log(&mut self, call: String) {
            self.mutations.push(call);
        }
    }

    impl Primitives for Recorder {
        fn frontend_names(&self) -> Vec<String> {
            self.doc.frontend_names()
        }
        fn get_frontend(&self, name: &str) -> Result<Frontend, ConfError> {
            self.doc.get_frontend(name)
        }
        fn create_frontend(&mut self, frontend: &Frontend) -> Result<(), ConfError> {
            self.log(format!("create_frontend {}", frontend.name));
            self.doc.create_frontend(frontend)
        }
        fn edit_frontend(&mut self, name: &str, frontend: &Frontend) -> Result<(), ConfError> {
            self.log(format!("edit_frontend {}", name));
            self.doc.edit_frontend(name, frontend)
        }
        fn delete_frontend(&mut self, name: &str) -> Result<(), ConfError> {
            self.log(format!("delete_frontend {}", name));
            self.doc.delete_frontend(name)
        }
        fn get_backend(&self, name: &str) -> Result<Backend, ConfError> {
            self.doc.get_backend(name)
        }
        fn create_backend(&mut self, backend: &Backend) -> Result<(), ConfError> {
            self.log(format!("create_backend {}", backend.name));
            self.doc.create_backend(backend)
        }
        fn edit_backend(&mut self, name: &str, backend: &Backend) -> Result<(), ConfError> {
            self.log(format!("edit_backend {}", name));
            self.doc.edit_backend(name, backend)
        }
        fn delete_backend(&mut self, name: &str) -> Result<(), ConfError> {
            self.log(format!("delete_backend {}", name));
            self.doc.delete_backend(name)
        }
        fn get_binds(&self, frontend: &str) -> Result<Vec<Bind>, ConfError> {
            self.doc.get_binds(frontend)
        }
        fn create_bind(&mut self, frontend: &str, bind: &Bind) -> Result<(), ConfError> {
            self.log(format!("create_bind {}", bind.name));
            self.doc.create_bind(frontend, bind)
        }
        fn edit_bind(&mut self, name: &str, frontend: &str, bind: &Bind) -> Result<(), ConfError> {
            self.log(format!("edit_bind {}", name));
            self.doc.edit_bind(name, frontend, bind)
        }
        fn delete_bind(&mut self, name: &str, frontend: &str) -> Result<(), ConfError> {
            self.log(format!("delete_bind {}", name));
            self.doc.delete_bind(name, frontend)
        }
        fn get_servers(&self, backend: &str) -> Result<Vec<Server>, ConfError> {
            self.doc.get_servers(backend)
        }
        fn create_server(&mut self, backend: &str, server: &Server) -> Result<(), ConfError> {
            self.log(format!("create_server {}", server.name));
            self.doc.create_server(backend, server)
        }
        fn edit_server(
            &mut self,
            name: &str,
            backend: &str,
            server: &Server,
        ) -> Result<(), ConfError> {
            self.log(format!("edit_server {}", name));
            self.doc.edit_server(name, backend, server)
        }
        fn delete_server(&mut self, name: &str, backend: &str) -> Result<(), ConfError> {
            self.log(format!("delete_server {}", name));
            self.doc.delete_server(name, backend)
        }
        fn get_backend_switching_rules(
            &self,
            frontend: &str,
        ) -> Result<Vec<BackendSwitchingRule>, ConfError> {
            self.doc.get_backend_switching_rules(frontend)
        }
        fn create_backend_switching_rule(
            &mut self,
            index: usize,
            frontend: &str,
            rule: &BackendSwitchingRule,
        ) -> Result<(), ConfError> {
            self.log(format!("create_rule {} {}", index, rule.name));
            self.doc.create_backend_switching_rule(index, frontend, rule)
        }
        fn edit_backend_switching_rule(
            &mut self,
            index: usize,
            frontend: &str,
            rule: &BackendSwitchingRule,
        ) -> Result<(), ConfError> {
            self.log(format!("edit_rule {} {}", index, rule.name));
            self.doc.edit_backend_switching_rule(index, frontend, rule)
        }
        fn delete_backend_switching_rule(
            &mut self,
            index: usize,
            frontend: &str,
        ) -> Result<(), ConfError> {
            self.log(format!("delete_rule {}", index));
            self.doc.delete_backend_switching_rule(index, frontend)
        }
    }

    fn server(address: &str, port: u16) -> Server {
        Server {
            name: String::new(),
            address: address.into(),
            port,
        }
    }

    fn conditional(name: &str, test: &str) -> Farm {
        let mut farm = Farm::new(name, UseAs::Conditional);
        farm.cond = Some(Cond::If);
        farm.cond_test = Some(test.into());
        farm
    }

    fn site() -> Site {
        let mut app = Farm::new("app1", UseAs::Default);
        app.mode = Some(Mode::Http);
        app.servers.push(server("10.0.0.1", 8080));
        let mut api = conditional("api", "{ path_beg /api }");
        api.servers.push(server("10.0.1.1", 9000));

        Site {
            name: "web".into(),
            service: Service {
                mode: Some(Mode::Http),
                listeners: vec![Bind {
                    name: String::new(),
                    address: "0.0.0.0".into(),
                    port: 80,
                }],
                ..Service::default()
            },
            farms: vec![app, api],
        }
    }

    fn created() -> Recorder {
        let mut recorder = Recorder::default();
        Reconciler::new(&mut recorder).create(&site()).unwrap();
        recorder.mutations.clear();
        recorder
    }

    #[test]
    fn test_create_orders_entities_before_relations() {
        let mut recorder = Recorder::default();
        Reconciler::new(&mut recorder).create(&site()).unwrap();

        assert_eq!(
            recorder.mutations,
            [
                "create_frontend web",
                "create_bind 0.0.0.0:80",
                "create_backend app1",
                "create_server 10.0.0.1:8080",
                "edit_frontend web",
                "create_backend api",
                "create_server 10.0.1.1:9000",
                "create_rule 0 api",
            ]
        );
        assert_eq!(read_site(&recorder.doc, "web").unwrap(), site().normalized());
    }

    #[test]
    fn test_create_collects_every_failure() {
        let mut recorder = Recorder::default();
        let mut desired = site();
        desired.farms[1].cond_test = None;
        desired.farms[0].servers.push(server("10.0.0.1", 8080));
        desired.farms.push(conditional("extra", "is_extra"));

        let err = Reconciler::new(&mut recorder).create(&desired).unwrap_err();
        let causes = err.causes();
        assert_eq!(causes.len(), 2);
        assert!(matches!(causes[0], ConfError::ObjectAlreadyExists(_)));
        assert!(matches!(causes[1], ConfError::MissingCondition(ref b) if b == "api"));

        // The unrelated farm after the failures was still created and attached.
        assert!(recorder.mutations.contains(&"create_rule 0 extra".to_string()));
    }

    #[test]
    fn test_create_rejects_two_defaults_without_mutations() {
        let mut recorder = Recorder::default();
        let mut desired = site();
        desired.farms[1].use_as = UseAs::Default;

        let err = Reconciler::new(&mut recorder).create(&desired).unwrap_err();
        assert!(matches!(err, ConfError::Validation(_)));
        assert!(recorder.mutations.is_empty());
    }

    #[test]
    fn test_edit_with_current_state_is_a_no_op() {
        let mut recorder = created();
        let current = read_site(&recorder.doc, "web").unwrap();

        Reconciler::new(&mut recorder).edit("web", &current).unwrap();
        assert!(recorder.mutations.is_empty(), "{:?}", recorder.mutations);
    }

    #[test]
    fn test_edit_with_unnamed_entities_is_a_no_op() {
        let mut recorder = created();
        Reconciler::new(&mut recorder).edit("web", &site()).unwrap();
        assert!(recorder.mutations.is_empty(), "{:?}", recorder.mutations);
    }

    #[test]
    fn test_edit_service_and_listeners() {
        let mut recorder = created();
        let mut desired = site();
        desired.service.maxconn = Some(500);
        desired.service.listeners.push(Bind {
            name: "https".into(),
            address: "0.0.0.0".into(),
            port: 443,
        });
        desired.service.listeners.remove(0);

        Reconciler::new(&mut recorder).edit("web", &desired).unwrap();
        assert_eq!(
            recorder.mutations,
            ["edit_frontend web", "create_bind https", "delete_bind 0.0.0.0:80"]
        );

        let frontend = recorder.doc.get_frontend("web").unwrap();
        assert_eq!(frontend.maxconn, Some(500));
        assert_eq!(frontend.default_backend.as_deref(), Some("app1"));
    }

    #[test]
    fn test_edit_farm_fields_and_servers() {
        let mut recorder = created();
        let mut desired = site();
        desired.farms[0].balance = Some(Balance {
            algorithm: BalanceAlgorithm::LeastConn,
            arguments: Vec::new(),
        });
        desired.farms[0].servers = vec![
            Server {
                name: "10.0.0.1:8080".into(),
                address: "10.0.0.1".into(),
                port: 8081,
            },
            server("10.0.0.2", 8080),
        ];

        Reconciler::new(&mut recorder).edit("web", &desired).unwrap();
        assert_eq!(
            recorder.mutations,
            [
                "edit_backend app1",
                "edit_server 10.0.0.1:8080",
                "create_server 10.0.0.2:8080",
            ]
        );
        assert_eq!(read_site(&recorder.doc, "web").unwrap(), desired.normalized());
    }

    #[test]
    fn test_edit_switches_attachment_modes() {
        let mut recorder = created();
        let mut desired = site();
        desired.farms[0] = {
            let mut farm = conditional("app1", "is_app");
            farm.mode = Some(Mode::Http);
            farm.servers.push(server("10.0.0.1", 8080));
            farm
        };
        desired.farms[1].use_as = UseAs::Default;
        desired.farms[1].cond = None;
        desired.farms[1].cond_test = None;

        Reconciler::new(&mut recorder).edit("web", &desired).unwrap();

        let frontend = recorder.doc.get_frontend("web").unwrap();
        assert_eq!(frontend.default_backend.as_deref(), Some("api"));
        let rules = recorder.doc.get_backend_switching_rules("web").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "app1");

        let site = read_site(&recorder.doc, "web").unwrap();
        assert_eq!(site.farms.len(), 2);
        assert_eq!(site.farm("api").unwrap().use_as, UseAs::Default);
        assert_eq!(site.farm("app1").unwrap().use_as, UseAs::Conditional);
    }

    #[test]
    fn test_edit_default_to_conditional_clears_pointer() {
        let mut recorder = created();
        let mut desired = site();
        desired.farms[0].use_as = UseAs::Conditional;
        desired.farms[0].cond = Some(Cond::Unless);
        desired.farms[0].cond_test = Some("is_api".into());

        Reconciler::new(&mut recorder).edit("web", &desired).unwrap();

        let frontend = recorder.doc.get_frontend("web").unwrap();
        assert_eq!(frontend.default_backend, None);
        let names: Vec<_> = recorder
            .doc
            .get_backend_switching_rules("web")
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["api", "app1"]);
    }

    #[test]
    fn test_edit_changes_predicate_in_place() {
        let mut recorder = created();
        let mut desired = site();
        desired.farms[1].cond_test = Some("{ path_beg /v2 }".into());

        Reconciler::new(&mut recorder).edit("web", &desired).unwrap();
        assert_eq!(recorder.mutations, ["edit_rule 0 api"]);
    }

    #[test]
    fn test_edit_removes_farms_after_detaching() {
        let mut recorder = created();
        let mut desired = site();
        desired.farms.truncate(0);

        Reconciler::new(&mut recorder).edit("web", &desired).unwrap();
        assert_eq!(
            recorder.mutations,
            [
                "edit_frontend web",
                "delete_backend app1",
                "delete_rule 0",
                "delete_backend api",
            ]
        );
        assert!(recorder.doc.backends.is_empty());
        assert_eq!(recorder.doc.get_frontend("web").unwrap().default_backend, None);
    }

    #[test]
    fn test_edit_rejects_second_default() {
        let mut recorder = created();
        let mut desired = site();
        desired.farms.push(Farm::new("app2", UseAs::Default));

        let err = Reconciler::new(&mut recorder).edit("web", &desired).unwrap_err();
        assert!(matches!(err, ConfError::Validation(ref m) if m.contains("Multiple default")));
        assert!(recorder.mutations.is_empty());
    }

    #[test]
    fn test_edit_rejects_rename() {
        let mut recorder = created();
        let mut desired = site();
        desired.name = "other".into();

        let err = Reconciler::new(&mut recorder).edit("web", &desired).unwrap_err();
        assert!(matches!(err, ConfError::Validation(_)));
    }

    #[test]
    fn test_edit_missing_site() {
        let mut recorder = Recorder::default();
        let err = Reconciler::new(&mut recorder).edit("web", &site()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_cascades() {
        let mut recorder = created();
        Reconciler::new(&mut recorder).delete("web").unwrap();

        assert_eq!(
            recorder.mutations,
            ["delete_frontend web", "delete_backend app1", "delete_backend api"]
        );
        assert_eq!(recorder.doc, Document::new());
    }
}
