//! `PerceptualDecisionMaking-v0`: two-alternative forced choice.
//!
//! Each trial shows a fixation cue, then two noisy stimuli whose mean
//! difference is set by the trial coherence, then a delay, then a decision
//! window. The agent must hold fixation (action 0) until the decision window
//! and then report the stronger stimulus (1 = left, 2 = right).
//!
//! Trials follow each other without ending the episode. Episodes only end by
//! truncation when `max_steps` is set.

use gymd_protocol::Action;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::{Params, parse_params};
use crate::env::{EnvError, EnvValue, Environment, Info, NdArray, Reset, Scalar, Space, Step};

pub(super) const TASK_NAME: &str = "PerceptualDecisionMaking-v0";

const FIXATE: i64 = 0;
const N_ACTIONS: u64 = 3;

/// Longest trial accepted, in timesteps.
const MAX_TRIAL_STEPS: usize = 100_000;

/// Period durations in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    pub fixation: f64,
    pub stimulus: f64,
    pub delay: f64,
    pub decision: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            fixation: 100.0,
            stimulus: 2000.0,
            delay: 0.0,
            decision: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rewards {
    /// Breaking fixation during the fixation period.
    pub abort: f64,
    pub correct: f64,
    pub fail: f64,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            abort: -0.1,
            correct: 1.0,
            fail: 0.0,
        }
    }
}

/// Parameters accepted by `PerceptualDecisionMaking-v0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerceptualConfig {
    /// Timestep in milliseconds.
    pub dt: f64,
    /// Input noise, scaled by `1 / sqrt(dt)`.
    pub sigma: f64,
    /// Coherences (percent) sampled uniformly per trial.
    pub cohs: Vec<f64>,
    /// End the trial when fixation is broken.
    pub abort: bool,
    pub timing: Timing,
    pub rewards: Rewards,
    /// Truncate the episode after this many steps.
    pub max_steps: Option<u64>,
    /// Seed used when `reset` is called without one.
    pub seed: Option<u64>,
}

impl Default for PerceptualConfig {
    fn default() -> Self {
        Self {
            dt: 100.0,
            sigma: 1.0,
            cohs: vec![0.0, 6.4, 12.8, 25.6, 51.2],
            abort: false,
            timing: Timing::default(),
            rewards: Rewards::default(),
            max_steps: None,
            seed: None,
        }
    }
}

impl PerceptualConfig {
    fn validate(&self) -> Result<(), EnvError> {
        let invalid = |msg: &str| Err(EnvError::InvalidParameter(msg.to_string()));
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return invalid("dt must be a positive number");
        }
        if !(self.sigma >= 0.0 && self.sigma.is_finite()) {
            return invalid("sigma must be non-negative");
        }
        if self.cohs.is_empty() {
            return invalid("cohs must not be empty");
        }
        if self.cohs.iter().any(|c| !(0.0..=100.0).contains(c)) {
            return invalid("cohs must lie in [0, 100]");
        }
        let t = &self.timing;
        if [t.fixation, t.stimulus, t.delay, t.decision]
            .iter()
            .any(|d| !(*d >= 0.0 && d.is_finite()))
        {
            return invalid("timing durations must be non-negative");
        }
        if t.decision < self.dt {
            return invalid("timing.decision must span at least one dt");
        }
        let trial_steps: f64 = [t.fixation, t.stimulus, t.delay, t.decision]
            .iter()
            .map(|d| (d / self.dt).floor())
            .sum();
        if trial_steps > MAX_TRIAL_STEPS as f64 {
            return Err(EnvError::InvalidParameter(format!(
                "timing spans {} steps per trial, at most {} allowed",
                trial_steps, MAX_TRIAL_STEPS
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Fixation,
    Stimulus,
    Delay,
    Decision,
}

/// One trial, precomputed on the dt grid.
#[derive(Debug)]
struct Trial {
    /// 0 = left, 1 = right.
    ground_truth: usize,
    coherence: f64,
    periods: Vec<Period>,
    observations: Vec<[f32; 3]>,
}

impl Trial {
    fn len(&self) -> usize {
        self.periods.len()
    }

    /// Correct action at step `t`.
    fn target(&self, t: usize) -> i64 {
        match self.periods[t] {
            Period::Decision => self.ground_truth as i64 + 1,
            _ => FIXATE,
        }
    }
}

#[derive(Debug)]
pub struct PerceptualDecisionMaking {
    config: PerceptualConfig,
    noise: Normal<f64>,
    rng: StdRng,
    trial: Option<Trial>,
    /// Index into the current trial.
    t: usize,
    elapsed: u64,
    closed: bool,
}

impl PerceptualDecisionMaking {
    pub fn new(config: PerceptualConfig) -> Result<Self, EnvError> {
        config.validate()?;
        let noise = Normal::new(0.0, config.sigma / config.dt.sqrt())
            .map_err(|e| EnvError::InvalidParameter(format!("sigma: {}", e)))?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            config,
            noise,
            rng,
            trial: None,
            t: 0,
            elapsed: 0,
            closed: false,
        })
    }

    pub fn from_params(params: Params) -> Result<Self, EnvError> {
        Self::new(parse_params(TASK_NAME, params)?)
    }

    fn steps(&self, duration_ms: f64) -> usize {
        (duration_ms / self.config.dt) as usize
    }

    fn new_trial(&mut self) -> Trial {
        let ground_truth = self.rng.random_range(0..2usize);
        let coherence = self.config.cohs[self.rng.random_range(0..self.config.cohs.len())];

        let timing = &self.config.timing;
        let mut periods = Vec::new();
        for (period, duration) in [
            (Period::Fixation, timing.fixation),
            (Period::Stimulus, timing.stimulus),
            (Period::Delay, timing.delay),
            (Period::Decision, timing.decision),
        ] {
            periods.extend(std::iter::repeat_n(period, self.steps(duration)));
        }

        let strong = (1.0 + coherence / 100.0) / 2.0;
        let weak = (1.0 - coherence / 100.0) / 2.0;
        let observations = periods
            .iter()
            .map(|period| match period {
                Period::Fixation | Period::Delay => [1.0, 0.0, 0.0],
                Period::Stimulus => {
                    let mut stim = [weak, weak];
                    stim[ground_truth] = strong;
                    [
                        1.0,
                        (stim[0] + self.noise.sample(&mut self.rng)) as f32,
                        (stim[1] + self.noise.sample(&mut self.rng)) as f32,
                    ]
                }
                Period::Decision => [0.0, 0.0, 0.0],
            })
            .collect();

        Trial {
            ground_truth,
            coherence,
            periods,
            observations,
        }
    }

    fn observation(&self) -> NdArray {
        match &self.trial {
            Some(trial) => NdArray::vector(trial.observations[self.t].to_vec()),
            None => NdArray::vector(vec![0.0; 3]),
        }
    }
}

impl Environment for PerceptualDecisionMaking {
    fn reset(&mut self, seed: Option<u64>) -> Result<Reset, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        let trial = self.new_trial();
        self.trial = Some(trial);
        self.t = 0;
        self.elapsed = 0;
        Ok(Reset {
            observation: self.observation(),
            info: Info::new(),
        })
    }

    fn step(&mut self, action: &Action) -> Result<Step, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        let Some(trial) = self.trial.as_ref() else {
            return Err(EnvError::ResetNeeded);
        };
        let Some(choice) = action.as_discrete().filter(|a| (0..N_ACTIONS as i64).contains(a))
        else {
            return Err(EnvError::invalid_action(format!(
                "{:?} is outside Discrete({})",
                action, N_ACTIONS
            )));
        };

        let rewards = &self.config.rewards;
        let target = trial.target(self.t);
        let coherence = trial.coherence;
        let mut reward = 0.0;
        let mut new_trial = false;
        match trial.periods[self.t] {
            Period::Fixation if choice != FIXATE => {
                new_trial = self.config.abort;
                reward += rewards.abort;
            }
            Period::Decision if choice != FIXATE => {
                new_trial = true;
                reward += if choice == target {
                    rewards.correct
                } else {
                    rewards.fail
                };
            }
            _ => {}
        }

        self.t += 1;
        if self.t >= trial.len() {
            new_trial = true;
        }
        if new_trial {
            let next = self.new_trial();
            self.trial = Some(next);
            self.t = 0;
        }
        self.elapsed += 1;

        let mut info = Info::new();
        info.insert("new_trial".to_string(), EnvValue::Bool(new_trial));
        info.insert("gt".to_string(), EnvValue::Int(target));
        info.insert("coh".to_string(), EnvValue::Float(coherence));

        Ok(Step {
            observation: self.observation(),
            reward: Scalar::F64(reward),
            terminated: false,
            truncated: self
                .config
                .max_steps
                .is_some_and(|max| self.elapsed >= max),
            info,
        })
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.closed = true;
        self.trial = None;
        Ok(())
    }

    fn observation_space(&self) -> Space {
        Space::boxed(vec![3], f64::NEG_INFINITY, f64::INFINITY)
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: N_ACTIONS }
    }
}
