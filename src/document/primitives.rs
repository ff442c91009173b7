//! Per-primitive CRUD on a configuration document.
//!
//! # Responsibilities
//! - Create, read, edit and delete frontends, backends, binds, servers and
//!   backend switching rules
//! - Enforce key uniqueness and parent existence for single objects
//!
//! Each call touches exactly one object and either succeeds or leaves the
//! document unchanged. Multi-object consistency is the caller's job.

use crate::document::{BackendSection, Document, FrontendSection};
use crate::error::ConfError;
use crate::model::{Backend, BackendSwitchingRule, Bind, Frontend, Server};

/// CRUD surface over the primitive objects of a working copy.
pub trait Primitives {
    /// Frontend names in document order.
    fn frontend_names(&self) -> Vec<String>;
    fn get_frontend(&self, name: &str) -> Result<Frontend, ConfError>;
    fn create_frontend(&mut self, frontend: &Frontend) -> Result<(), ConfError>;
    fn edit_frontend(&mut self, name: &str, frontend: &Frontend) -> Result<(), ConfError>;
    fn delete_frontend(&mut self, name: &str) -> Result<(), ConfError>;

    fn get_backend(&self, name: &str) -> Result<Backend, ConfError>;
    fn create_backend(&mut self, backend: &Backend) -> Result<(), ConfError>;
    fn edit_backend(&mut self, name: &str, backend: &Backend) -> Result<(), ConfError>;
    fn delete_backend(&mut self, name: &str) -> Result<(), ConfError>;

    fn get_binds(&self, frontend: &str) -> Result<Vec<Bind>, ConfError>;
    fn create_bind(&mut self, frontend: &str, bind: &Bind) -> Result<(), ConfError>;
    fn edit_bind(&mut self, name: &str, frontend: &str, bind: &Bind) -> Result<(), ConfError>;
    fn delete_bind(&mut self, name: &str, frontend: &str) -> Result<(), ConfError>;

    fn get_servers(&self, backend: &str) -> Result<Vec<Server>, ConfError>;
    fn create_server(&mut self, backend: &str, server: &Server) -> Result<(), ConfError>;
    fn edit_server(&mut self, name: &str, backend: &str, server: &Server) -> Result<(), ConfError>;
    fn delete_server(&mut self, name: &str, backend: &str) -> Result<(), ConfError>;

    fn get_backend_switching_rules(
        &self,
        frontend: &str,
    ) -> Result<Vec<BackendSwitchingRule>, ConfError>;
    /// Insert `rule` at `index`; `index` may equal the rule count to append.
    fn create_backend_switching_rule(
        &mut self,
        index: usize,
        frontend: &str,
        rule: &BackendSwitchingRule,
    ) -> Result<(), ConfError>;
    fn edit_backend_switching_rule(
        &mut self,
        index: usize,
        frontend: &str,
        rule: &BackendSwitchingRule,
    ) -> Result<(), ConfError>;
    fn delete_backend_switching_rule(&mut self, index: usize, frontend: &str)
        -> Result<(), ConfError>;
}

fn missing(kind: &str, name: &str) -> ConfError {
    ConfError::ObjectDoesNotExist(format!("{} {} does not exist", kind, name))
}

fn duplicate(kind: &str, name: &str) -> ConfError {
    ConfError::ObjectAlreadyExists(format!("{} {} already exists", kind, name))
}

impl Document {
    fn frontend_or_missing(&self, name: &str) -> Result<&FrontendSection, ConfError> {
        self.frontend_section(name)
            .ok_or_else(|| missing("frontend", name))
    }

    fn frontend_or_missing_mut(&mut self, name: &str) -> Result<&mut FrontendSection, ConfError> {
        self.frontend_section_mut(name)
            .ok_or_else(|| missing("frontend", name))
    }

    fn backend_or_missing(&self, name: &str) -> Result<&BackendSection, ConfError> {
        self.backend_section(name)
            .ok_or_else(|| missing("backend", name))
    }

    fn backend_or_missing_mut(&mut self, name: &str) -> Result<&mut BackendSection, ConfError> {
        self.backend_section_mut(name)
            .ok_or_else(|| missing("backend", name))
    }
}

impl Primitives for Document {
    fn frontend_names(&self) -> Vec<String> {
        self.frontends.iter().map(|s| s.frontend.name.clone()).collect()
    }

    fn get_frontend(&self, name: &str) -> Result<Frontend, ConfError> {
        Ok(self.frontend_or_missing(name)?.frontend.clone())
    }

    fn create_frontend(&mut self, frontend: &Frontend) -> Result<(), ConfError> {
        if self.frontend_section(&frontend.name).is_some() {
            return Err(duplicate("frontend", &frontend.name));
        }
        self.frontends.push(FrontendSection {
            frontend: frontend.clone(),
            ..FrontendSection::default()
        });
        Ok(())
    }

    fn edit_frontend(&mut self, name: &str, frontend: &Frontend) -> Result<(), ConfError> {
        let section = self.frontend_or_missing_mut(name)?;
        section.frontend = Frontend {
            name: name.to_string(),
            ..frontend.clone()
        };
        Ok(())
    }

    fn delete_frontend(&mut self, name: &str) -> Result<(), ConfError> {
        let before = self.frontends.len();
        self.frontends.retain(|s| s.frontend.name != name);
        if self.frontends.len() == before {
            return Err(missing("frontend", name));
        }
        Ok(())
    }

    fn get_backend(&self, name: &str) -> Result<Backend, ConfError> {
        Ok(self.backend_or_missing(name)?.backend.clone())
    }

    fn create_backend(&mut self, backend: &Backend) -> Result<(), ConfError> {
        if self.backend_section(&backend.name).is_some() {
            return Err(duplicate("backend", &backend.name));
        }
        self.backends.push(BackendSection {
            backend: backend.clone(),
            servers: Vec::new(),
        });
        Ok(())
    }

    fn edit_backend(&mut self, name: &str, backend: &Backend) -> Result<(), ConfError> {
        let section = self.backend_or_missing_mut(name)?;
        section.backend = Backend {
            name: name.to_string(),
            ..backend.clone()
        };
        Ok(())
    }

    fn delete_backend(&mut self, name: &str) -> Result<(), ConfError> {
        let before = self.backends.len();
        self.backends.retain(|s| s.backend.name != name);
        if self.backends.len() == before {
            return Err(missing("backend", name));
        }
        Ok(())
    }

    fn get_binds(&self, frontend: &str) -> Result<Vec<Bind>, ConfError> {
        Ok(self.frontend_or_missing(frontend)?.binds.clone())
    }

    fn create_bind(&mut self, frontend: &str, bind: &Bind) -> Result<(), ConfError> {
        let section = self.frontend_or_missing_mut(frontend)?;
        if section.binds.iter().any(|b| b.name == bind.name) {
            return Err(duplicate("bind", &bind.name));
        }
        section.binds.push(bind.clone());
        Ok(())
    }

    fn edit_bind(&mut self, name: &str, frontend: &str, bind: &Bind) -> Result<(), ConfError> {
        let section = self.frontend_or_missing_mut(frontend)?;
        let index = section
            .binds
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| missing("bind", name))?;
        if bind.name != name && section.binds.iter().any(|b| b.name == bind.name) {
            return Err(duplicate("bind", &bind.name));
        }
        section.binds[index] = bind.clone();
        Ok(())
    }

    fn delete_bind(&mut self, name: &str, frontend: &str) -> Result<(), ConfError> {
        let section = self.frontend_or_missing_mut(frontend)?;
        let index = section
            .binds
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| missing("bind", name))?;
        section.binds.remove(index);
        Ok(())
    }

    fn get_servers(&self, backend: &str) -> Result<Vec<Server>, ConfError> {
        Ok(self.backend_or_missing(backend)?.servers.clone())
    }

    fn create_server(&mut self, backend: &str, server: &Server) -> Result<(), ConfError> {
        let section = self.backend_or_missing_mut(backend)?;
        if section.servers.iter().any(|s| s.name == server.name) {
            return Err(duplicate("server", &server.name));
        }
        section.servers.push(server.clone());
        Ok(())
    }

    fn edit_server(&mut self, name: &str, backend: &str, server: &Server) -> Result<(), ConfError> {
        let section = self.backend_or_missing_mut(backend)?;
        let index = section
            .servers
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| missing("server", name))?;
        if server.name != name && section.servers.iter().any(|s| s.name == server.name) {
            return Err(duplicate("server", &server.name));
        }
        section.servers[index] = server.clone();
        Ok(())
    }

    fn delete_server(&mut self, name: &str, backend: &str) -> Result<(), ConfError> {
        let section = self.backend_or_missing_mut(backend)?;
        let index = section
            .servers
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| missing("server", name))?;
        section.servers.remove(index);
        Ok(())
    }

    fn get_backend_switching_rules(
        &self,
        frontend: &str,
    ) -> Result<Vec<BackendSwitchingRule>, ConfError> {
        Ok(self.frontend_or_missing(frontend)?.backend_switching_rules.clone())
    }

    fn create_backend_switching_rule(
        &mut self,
        index: usize,
        frontend: &str,
        rule: &BackendSwitchingRule,
    ) -> Result<(), ConfError> {
        let section = self.frontend_or_missing_mut(frontend)?;
        if index > section.backend_switching_rules.len() {
            return Err(missing("backend switching rule", &index.to_string()));
        }
        section.backend_switching_rules.insert(index, rule.clone());
        Ok(())
    }

    fn edit_backend_switching_rule(
        &mut self,
        index: usize,
        frontend: &str,
        rule: &BackendSwitchingRule,
    ) -> Result<(), ConfError> {
        let section = self.frontend_or_missing_mut(frontend)?;
        let slot = section
            .backend_switching_rules
            .get_mut(index)
            .ok_or_else(|| missing("backend switching rule", &index.to_string()))?;
        *slot = rule.clone();
        Ok(())
    }

    fn delete_backend_switching_rule(
        &mut self,
        index: usize,
        frontend: &str,
    ) -> Result<(), ConfError> {
        let section = self.frontend_or_missing_mut(frontend)?;
        if index >= section.backend_switching_rules.len() {
            return Err(missing("backend switching rule", &index.to_string()));
        }
        section.backend_switching_rules.remove(index);
        Ok(())
    }
}
