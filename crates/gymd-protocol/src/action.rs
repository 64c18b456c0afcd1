//! Actions sent to an environment.

use serde::{Deserialize, Serialize};

/// Action forwarded to an environment's `step`.
///
/// Serialized untagged so clients send either a bare integer or a list of
/// floats:
///
/// ```
/// use gymd_protocol::Action;
///
/// let a: Action = serde_json::from_str("1").unwrap();
/// assert_eq!(a, Action::Discrete(1));
///
/// let b: Action = serde_json::from_str("[0.5, -0.25]").unwrap();
/// assert_eq!(b, Action::Continuous(vec![0.5, -0.25]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Index of a discrete choice.
    Discrete(i64),
    /// Continuous control values.
    Continuous(Vec<f64>),
}

impl Action {
    /// Discrete index, if this is a discrete action.
    pub fn as_discrete(&self) -> Option<i64> {
        match self {
            Self::Discrete(index) => Some(*index),
            Self::Continuous(_) => None,
        }
    }
}

impl From<i64> for Action {
    fn from(index: i64) -> Self {
        Self::Discrete(index)
    }
}

impl From<Vec<f64>> for Action {
    fn from(values: Vec<f64>) -> Self {
        Self::Continuous(values)
    }
}
