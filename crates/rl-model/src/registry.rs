// registry.rs — Per-collection workflow resolution.
//
// Resolution order: explicit collection → workflow mapping, then the
// "default" workflow; absence of a default is a configuration error.
// Built workflows are cached for the process lifetime behind an explicit,
// invalidatable cache — a cache hit never re-validates the definition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::def::WorkflowDef;
use crate::error::ConfigError;
use crate::workflow::Workflow;

#[derive(Default)]
struct RegistryCache {
    built: HashMap<String, Arc<Workflow>>,
    by_collection: HashMap<Uuid, Arc<Workflow>>,
}

/// Registry of workflow definitions, keyed by id, with a collection map.
pub struct WorkflowRegistry {
    defs: HashMap<String, WorkflowDef>,
    mapping: HashMap<Uuid, String>,
    default: Option<String>,
    cache: Mutex<RegistryCache>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            defs: HashMap::new(),
            mapping: HashMap::new(),
            default: None,
            cache: Mutex::new(RegistryCache::default()),
        }
    }

    /// Register a raw definition. Validation is deferred to first use so a
    /// broken definition only fails the collections mapped to it.
    pub fn add_definition(&mut self, def: WorkflowDef) {
        self.defs.insert(def.id.clone(), def);
    }

    /// Map a collection to a workflow id.
    pub fn map_collection(&mut self, collection: Uuid, workflow_id: impl Into<String>) {
        self.mapping.insert(collection, workflow_id.into());
    }

    /// Set the fallback workflow used by unmapped collections.
    pub fn set_default(&mut self, workflow_id: impl Into<String>) {
        self.default = Some(workflow_id.into());
    }

    /// Resolve (and cache) the workflow for a collection.
    pub fn workflow_for(&self, collection: Uuid) -> Result<Arc<Workflow>, ConfigError> {
        if let Some(wf) = self.cache.lock().unwrap().by_collection.get(&collection) {
            return Ok(Arc::clone(wf));
        }
        let id = self
            .mapping
            .get(&collection)
            .or(self.default.as_ref())
            .ok_or(ConfigError::NoDefaultWorkflow(collection))?
            .clone();
        let wf = self.workflow(&id)?;
        self.cache
            .lock()
            .unwrap()
            .by_collection
            .insert(collection, Arc::clone(&wf));
        Ok(wf)
    }

    /// Resolve (and cache) a workflow by id.
    pub fn workflow(&self, id: &str) -> Result<Arc<Workflow>, ConfigError> {
        if let Some(wf) = self.cache.lock().unwrap().built.get(id) {
            return Ok(Arc::clone(wf));
        }
        let def = self
            .defs
            .get(id)
            .ok_or_else(|| ConfigError::WorkflowNotFound(id.to_string()))?;
        let wf = Arc::new(Workflow::build(def)?);
        tracing::debug!(workflow = %id, "workflow definition validated");
        self.cache
            .lock()
            .unwrap()
            .built
            .insert(id.to_string(), Arc::clone(&wf));
        Ok(wf)
    }

    /// Drop the cached workflow for one collection (reload on config change).
    pub fn invalidate(&self, collection: Uuid) {
        self.cache.lock().unwrap().by_collection.remove(&collection);
    }

    /// Drop everything cached; definitions are re-validated on next use.
    pub fn invalidate_all(&self) {
        let mut cache = self.cache.lock().unwrap();
        cache.built.clear();
        cache.by_collection.clear();
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ActionDef, StepDef};

    fn minimal_def(id: &str) -> WorkflowDef {
        WorkflowDef {
            id: id.to_string(),
            first_step: "only".to_string(),
            roles: vec![],
            steps: vec![StepDef {
                id: "only".to_string(),
                role: None,
                actions: vec![ActionDef {
                    id: "autoapprove".to_string(),
                    requires_ui: false,
                }],
                outcomes: vec![],
                required_users: 1,
                assignment: "claim".to_string(),
            }],
        }
    }

    #[test]
    fn explicit_mapping_wins_over_default() {
        let mut registry = WorkflowRegistry::new();
        registry.add_definition(minimal_def("default"));
        registry.add_definition(minimal_def("special"));
        registry.set_default("default");
        let coll = Uuid::new_v4();
        registry.map_collection(coll, "special");

        assert_eq!(registry.workflow_for(coll).unwrap().id(), "special");
        assert_eq!(registry.workflow_for(Uuid::new_v4()).unwrap().id(), "default");
    }

    #[test]
    fn no_default_is_a_config_error() {
        let registry = WorkflowRegistry::new();
        let coll = Uuid::new_v4();
        assert!(matches!(
            registry.workflow_for(coll),
            Err(ConfigError::NoDefaultWorkflow(c)) if c == coll
        ));
    }

    #[test]
    fn cache_returns_the_same_workflow() {
        let mut registry = WorkflowRegistry::new();
        registry.add_definition(minimal_def("default"));
        registry.set_default("default");
        let coll = Uuid::new_v4();

        let a = registry.workflow_for(coll).unwrap();
        let b = registry.workflow_for(coll).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn invalidate_drops_collection_entry() {
        let mut registry = WorkflowRegistry::new();
        registry.add_definition(minimal_def("default"));
        registry.set_default("default");
        let coll = Uuid::new_v4();

        let a = registry.workflow_for(coll).unwrap();
        registry.invalidate(coll);
        // Workflow id cache still holds the built graph; the collection
        // entry is re-resolved.
        let b = registry.workflow_for(coll).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        registry.invalidate_all();
        let c = registry.workflow_for(coll).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn broken_definition_fails_every_lookup_for_that_collection() {
        let mut registry = WorkflowRegistry::new();
        let mut def = minimal_def("default");
        def.first_step = "missing".to_string();
        registry.add_definition(def);
        registry.set_default("default");

        let coll = Uuid::new_v4();
        assert!(registry.workflow_for(coll).is_err());
        assert!(registry.workflow_for(coll).is_err());
    }
}
