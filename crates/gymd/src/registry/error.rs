//! Registry error type.

use thiserror::Error;

use crate::env::EnvError;

/// Failure of a registry operation.
///
/// Each variant names the session or task involved so handlers can build a
/// precise message without extra lookups.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("failed to create environment '{task_name}': {message}")]
    Creation { task_name: String, message: String },

    #[error("invalid action for session {session_id}: {message}")]
    InvalidAction { session_id: String, message: String },

    #[error("{operation} failed for session {session_id}: {message}")]
    Runtime {
        session_id: String,
        operation: &'static str,
        message: String,
    },

    #[error("session limit of {limit} reached")]
    Capacity { limit: usize },
}

impl RegistryError {
    pub fn not_found(session_id: impl Into<String>) -> Self {
        Self::NotFound {
            session_id: session_id.into(),
        }
    }

    pub fn creation(task_name: impl Into<String>, cause: EnvError) -> Self {
        Self::Creation {
            task_name: task_name.into(),
            message: cause.to_string(),
        }
    }

    pub fn runtime(session_id: impl Into<String>, operation: &'static str, cause: EnvError) -> Self {
        Self::Runtime {
            session_id: session_id.into(),
            operation,
            message: cause.to_string(),
        }
    }

    /// Classify an error raised by `Environment::step`.
    pub(crate) fn from_step(session_id: &str, cause: EnvError) -> Self {
        match cause {
            EnvError::InvalidAction(message) => Self::InvalidAction {
                session_id: session_id.to_string(),
                message,
            },
            other => Self::runtime(session_id, "step", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_errors_are_classified() {
        let err = RegistryError::from_step("abc", EnvError::invalid_action("3 is outside Discrete(3)"));
        assert!(matches!(err, RegistryError::InvalidAction { .. }));

        let err = RegistryError::from_step("abc", EnvError::ResetNeeded);
        match err {
            RegistryError::Runtime {
                session_id,
                operation,
                message,
            } => {
                assert_eq!(session_id, "abc");
                assert_eq!(operation, "step");
                assert!(message.contains("reset"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_messages_carry_context() {
        let err = RegistryError::creation("NoSuchTask-v0", EnvError::UnknownTask("NoSuchTask-v0".into()));
        assert_eq!(
            err.to_string(),
            "failed to create environment 'NoSuchTask-v0': unknown task: NoSuchTask-v0"
        );
        assert_eq!(
            RegistryError::not_found("x").to_string(),
            "session not found: x"
        );
    }
}
