//! Environment capability.
//!
//! Every task the server can host implements [`Environment`]. The session
//! registry treats an environment as an opaque unit of work: it forwards
//! resets, steps and close calls and never inspects task semantics.

mod value;

use std::collections::BTreeMap;

use gymd_protocol::{Action, ActionSpaceInfo, ObservationSpaceInfo};
use thiserror::Error;

pub use value::{ArrayData, EnvValue, NdArray, Scalar, ShapeError, element_count};

/// Auxiliary diagnostics returned by reset and step.
pub type Info = BTreeMap<String, EnvValue>;

/// Errors raised by an environment.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("environment must be reset before stepping")]
    ResetNeeded,

    #[error("environment is closed")]
    Closed,

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("{0}")]
    Failed(String),
}

impl EnvError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn invalid_action(msg: impl Into<String>) -> Self {
        Self::InvalidAction(msg.into())
    }
}

/// Output of [`Environment::reset`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reset {
    pub observation: NdArray,
    pub info: Info,
}

/// Output of [`Environment::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: NdArray,
    pub reward: Scalar,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

/// Shape and bounds of observations or actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    /// `n` choices, `0..n`.
    Discrete { n: u64 },
    /// Bounded box of the given shape.
    Box {
        shape: Vec<usize>,
        low: f64,
        high: f64,
        dtype: String,
    },
}

impl Space {
    /// `float32` box.
    pub fn boxed(shape: Vec<usize>, low: f64, high: f64) -> Self {
        Space::Box {
            shape,
            low,
            high,
            dtype: "float32".to_string(),
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Space::Discrete { .. } => Vec::new(),
            Space::Box { shape, .. } => shape.clone(),
        }
    }

    pub fn dtype(&self) -> &str {
        match self {
            Space::Discrete { .. } => "int64",
            Space::Box { dtype, .. } => dtype,
        }
    }

    pub fn n(&self) -> Option<u64> {
        match self {
            Space::Discrete { n } => Some(*n),
            Space::Box { .. } => None,
        }
    }

    /// Whether `action` is a member of this space.
    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (Space::Discrete { n }, Action::Discrete(index)) => {
                u64::try_from(*index).is_ok_and(|i| i < *n)
            }
            (Space::Box { shape, low, high, .. }, Action::Continuous(values)) => {
                values.len() == shape.iter().product::<usize>()
                    && values.iter().all(|v| (*low..=*high).contains(v))
            }
            _ => false,
        }
    }

    pub fn observation_info(&self) -> ObservationSpaceInfo {
        ObservationSpaceInfo {
            shape: self.shape(),
            dtype: self.dtype().to_string(),
        }
    }

    pub fn action_info(&self) -> ActionSpaceInfo {
        ActionSpaceInfo {
            n: self.n(),
            shape: self.shape(),
        }
    }
}

/// A stateful simulation.
///
/// Implementations need not be thread-safe: the registry guarantees that
/// calls on one instance never overlap.
pub trait Environment: Send {
    /// Start a new episode.
    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError>;

    /// Advance one timestep with `action`.
    fn step(&mut self, action: &Action) -> Result<Step, EnvError>;

    /// Release resources. Called once, when the session is deleted.
    fn close(&mut self) -> Result<(), EnvError> {
        Ok(())
    }

    fn observation_space(&self) -> Space;

    fn action_space(&self) -> Space;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_contains() {
        let space = Space::Discrete { n: 3 };
        assert!(space.contains(&Action::Discrete(2)));
        assert!(!space.contains(&Action::Discrete(3)));
        assert!(!space.contains(&Action::Discrete(-1)));
        assert!(!space.contains(&Action::Continuous(vec![0.0])));
    }

    #[test]
    fn test_box_contains_checks_len_and_bounds() {
        let space = Space::boxed(vec![2], -1.0, 1.0);
        assert!(space.contains(&Action::Continuous(vec![0.5, -1.0])));
        assert!(!space.contains(&Action::Continuous(vec![0.5])));
        assert!(!space.contains(&Action::Continuous(vec![0.5, 1.5])));
    }

    #[test]
    fn test_space_descriptors() {
        let obs = Space::boxed(vec![3, 4], f64::NEG_INFINITY, f64::INFINITY);
        assert_eq!(obs.observation_info().shape, vec![3, 4]);
        assert_eq!(obs.observation_info().dtype, "float32");

        let act = Space::Discrete { n: 3 };
        assert_eq!(act.action_info().n, Some(3));
        assert!(act.action_info().shape.is_empty());
    }
}
