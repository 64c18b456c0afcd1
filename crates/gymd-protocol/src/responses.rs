//! Response bodies.

use serde::{Deserialize, Serialize};

use crate::{JsonMap, float};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Environment constructed, never reset.
    Created,
    /// At least one reset succeeded.
    Active,
    /// Deleted. Never returned for a live session.
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Created => write!(f, "created"),
            SessionState::Active => write!(f, "active"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

impl std::str::FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(SessionState::Created),
            // "reset" is accepted as an alias for the active state.
            "active" | "reset" => Ok(SessionState::Active),
            "terminated" => Ok(SessionState::Terminated),
            _ => Err(format!("unknown session state: {}", s)),
        }
    }
}

/// Observation space descriptor. `shape` reconstructs flattened observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpaceInfo {
    pub shape: Vec<usize>,
    pub dtype: String,
}

/// Action space descriptor. `n` is set for discrete spaces only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpaceInfo {
    pub n: Option<u64>,
    pub shape: Vec<usize>,
}

/// Information about a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub session_id: String,
    pub task_name: String,
    pub observation_space: ObservationSpaceInfo,
    pub action_space: ActionSpaceInfo,
    pub state: SessionState,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Number of successful resets.
    pub episodes: u64,
    /// Number of successful steps.
    pub steps: u64,
}

/// Result of a reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetResponse {
    /// Initial observation, flattened row-major.
    #[serde(with = "float::seq")]
    pub observation: Vec<f64>,
    pub info: JsonMap,
}

/// Result of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResponse {
    /// Observation after the action, flattened row-major.
    #[serde(with = "float::seq")]
    pub observation: Vec<f64>,
    #[serde(with = "float::scalar")]
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: JsonMap,
}

impl StepResponse {
    /// Whether the episode ended, by termination or truncation.
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Entry of the session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub task_name: String,
}

/// Body of `GET /environments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
}

/// Body of `GET /tasks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<String>,
}

/// Body of `DELETE /environments/{session_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

impl Default for DeleteResponse {
    fn default() -> Self {
        Self {
            message: "Environment deleted successfully".to_string(),
        }
    }
}
