//! `Dummy-v0`: a deterministic fixed-length task for smoke testing clients.

use gymd_protocol::Action;
use serde::{Deserialize, Serialize};

use super::{Params, parse_params};
use crate::env::{
    ArrayData, EnvError, EnvValue, Environment, Info, NdArray, Reset, Scalar, Space, Step,
    element_count,
};

pub(super) const TASK_NAME: &str = "Dummy-v0";

/// Largest observation accepted, in elements.
const MAX_OBS_ELEMENTS: usize = 1 << 20;

/// Parameters accepted by `Dummy-v0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DummyConfig {
    /// Observation shape. Observations are filled with the current step index.
    pub obs_shape: Vec<usize>,
    /// Number of discrete actions.
    pub n_actions: u64,
    /// Steps per episode; the last one is reported as truncated.
    pub episode_length: u64,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            obs_shape: vec![2],
            n_actions: 2,
            episode_length: 100,
        }
    }
}

/// Rewards action 0 with 1.0 and everything else with 0.0.
#[derive(Debug)]
pub struct DummyEnv {
    config: DummyConfig,
    obs_len: usize,
    elapsed: u64,
    closed: bool,
}

impl DummyEnv {
    pub fn new(config: DummyConfig) -> Result<Self, EnvError> {
        if config.n_actions == 0 {
            return Err(EnvError::InvalidParameter(
                "n_actions must be at least 1".to_string(),
            ));
        }
        if config.episode_length == 0 {
            return Err(EnvError::InvalidParameter(
                "episode_length must be at least 1".to_string(),
            ));
        }
        let obs_len = element_count(&config.obs_shape)
            .filter(|len| *len <= MAX_OBS_ELEMENTS)
            .ok_or_else(|| {
                EnvError::InvalidParameter(format!(
                    "obs_shape {:?} exceeds {} elements",
                    config.obs_shape, MAX_OBS_ELEMENTS
                ))
            })?;
        Ok(Self {
            config,
            obs_len,
            elapsed: 0,
            closed: false,
        })
    }

    pub fn from_params(params: Params) -> Result<Self, EnvError> {
        Self::new(parse_params(TASK_NAME, params)?)
    }

    fn observation(&self) -> Result<NdArray, EnvError> {
        let data = vec![self.elapsed as f32; self.obs_len];
        Ok(NdArray::new(
            self.config.obs_shape.clone(),
            ArrayData::F32(data),
        )?)
    }
}

impl Environment for DummyEnv {
    fn reset(&mut self, _seed: Option<u64>) -> Result<Reset, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        self.elapsed = 0;
        Ok(Reset {
            observation: self.observation()?,
            info: Info::new(),
        })
    }

    fn step(&mut self, action: &Action) -> Result<Step, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        if !self.action_space().contains(action) {
            return Err(EnvError::invalid_action(format!(
                "{:?} is outside Discrete({})",
                action, self.config.n_actions
            )));
        }

        self.elapsed += 1;
        let reward = if action.as_discrete() == Some(0) { 1.0 } else { 0.0 };

        let mut info = Info::new();
        info.insert("step".to_string(), EnvValue::UInt(self.elapsed));

        Ok(Step {
            observation: self.observation()?,
            reward: Scalar::F32(reward),
            terminated: false,
            truncated: self.elapsed >= self.config.episode_length,
            info,
        })
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.closed = true;
        Ok(())
    }

    fn observation_space(&self) -> Space {
        Space::boxed(self.config.obs_shape.clone(), 0.0, f64::INFINITY)
    }

    fn action_space(&self) -> Space {
        Space::Discrete {
            n: self.config.n_actions,
        }
    }
}
