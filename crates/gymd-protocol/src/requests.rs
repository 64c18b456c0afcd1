//! Request bodies.

use serde::{Deserialize, Serialize};

use crate::{Action, JsonMap};

/// Body of `POST /environments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnvironmentRequest {
    /// Name of the task environment, e.g. `"PerceptualDecisionMaking-v0"`.
    pub task_name: String,
    /// Task parameters, forwarded verbatim to the task constructor.
    #[serde(default)]
    pub kwargs: JsonMap,
}

impl CreateEnvironmentRequest {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            kwargs: JsonMap::new(),
        }
    }

    /// Add a task parameter.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

/// Body of `POST /environments/{session_id}/reset`. The body may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetRequest {
    /// Optional RNG seed for reproducible episodes.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Body of `POST /environments/{session_id}/step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    /// Session the action targets. Optional; when present it must match the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Action to take.
    pub action: Action,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_defaults_kwargs() {
        let req: CreateEnvironmentRequest =
            serde_json::from_value(json!({"task_name": "Dummy-v0"})).unwrap();
        assert_eq!(req.task_name, "Dummy-v0");
        assert!(req.kwargs.is_empty());
    }

    #[test]
    fn test_create_request_builder() {
        let req = CreateEnvironmentRequest::new("PerceptualDecisionMaking-v0").kwarg("dt", 100);
        assert_eq!(req.kwargs["dt"], json!(100));
    }

    #[test]
    fn test_step_request_accepts_legacy_session_id() {
        let req: StepRequest =
            serde_json::from_value(json!({"session_id": "abc", "action": 1})).unwrap();
        assert_eq!(req.session_id.as_deref(), Some("abc"));
        assert_eq!(req.action, Action::Discrete(1));
    }

    #[test]
    fn test_reset_request_empty_object() {
        let req: ResetRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.seed, None);
    }
}
