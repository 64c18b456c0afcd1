//! Task catalog.
//!
//! Maps task names to environment constructors. The registry looks tasks up
//! here on `create` and `GET /tasks` lists the catalog.

mod dummy;
mod perceptual;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use gymd_protocol::JsonMap;
use serde::de::DeserializeOwned;

use crate::env::{EnvError, Environment};

pub use dummy::{DummyConfig, DummyEnv};
pub use perceptual::{PerceptualDecisionMaking, PerceptualConfig, Rewards, Timing};

/// Task parameters as received from the client.
pub type Params = JsonMap;

/// Builds a fresh environment from task parameters.
pub type TaskConstructor =
    Arc<dyn Fn(Params) -> Result<Box<dyn Environment>, EnvError> + Send + Sync>;

/// Registered tasks, keyed by name.
#[derive(Clone, Default)]
pub struct TaskCatalog {
    tasks: BTreeMap<String, TaskConstructor>,
}

impl TaskCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every built-in task.
    pub fn builtin() -> Self {
        Self::new()
            .with_task(dummy::TASK_NAME, |params| {
                Ok(Box::new(DummyEnv::from_params(params)?))
            })
            .with_task(perceptual::TASK_NAME, |params| {
                Ok(Box::new(PerceptualDecisionMaking::from_params(params)?))
            })
    }

    /// Register a task, replacing any previous constructor with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(Params) -> Result<Box<dyn Environment>, EnvError> + Send + Sync + 'static,
    {
        self.tasks.insert(name.into(), Arc::new(constructor));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_task<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Params) -> Result<Box<dyn Environment>, EnvError> + Send + Sync + 'static,
    {
        self.register(name, constructor);
        self
    }

    /// Task names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Construct an environment for `name`.
    pub fn make(&self, name: &str, params: Params) -> Result<Box<dyn Environment>, EnvError> {
        let constructor = self
            .tasks
            .get(name)
            .ok_or_else(|| EnvError::UnknownTask(name.to_string()))?;
        constructor(params)
    }
}

impl fmt::Debug for TaskCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCatalog")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Deserialize task parameters into a typed config.
fn parse_params<T: DeserializeOwned>(task: &str, params: Params) -> Result<T, EnvError> {
    serde_json::from_value(serde_json::Value::Object(params))
        .map_err(|e| EnvError::InvalidParameter(format!("{}: {}", task, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_names_are_sorted() {
        let catalog = TaskCatalog::builtin();
        assert_eq!(
            catalog.names(),
            vec!["Dummy-v0".to_string(), "PerceptualDecisionMaking-v0".to_string()]
        );
    }

    #[test]
    fn test_unknown_task() {
        let catalog = TaskCatalog::builtin();
        let err = catalog.make("NoSuchTask-v0", Params::new()).err().unwrap();
        assert!(matches!(err, EnvError::UnknownTask(name) if name == "NoSuchTask-v0"));
    }

    #[test]
    fn test_unknown_parameter_is_rejected() {
        let catalog = TaskCatalog::builtin();
        let mut params = Params::new();
        params.insert("nonsense".to_string(), json!(1));
        let err = catalog.make("Dummy-v0", params).err().unwrap();
        assert!(matches!(err, EnvError::InvalidParameter(_)));
    }

    #[test]
    fn test_register_replaces() {
        let mut catalog = TaskCatalog::new();
        catalog.register("Custom-v0", |_| Err(EnvError::failed("first")));
        catalog.register("Custom-v0", |params| {
            Ok(Box::new(DummyEnv::from_params(params)?))
        });
        assert_eq!(catalog.len(), 1);
        assert!(catalog.make("Custom-v0", Params::new()).is_ok());
    }
}
