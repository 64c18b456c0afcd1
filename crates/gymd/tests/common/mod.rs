//! Test utilities and common setup.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use gymd::api::{self, AppState};
use gymd::env::{EnvError, Environment, Info, NdArray, Reset, Scalar, Space, Step};
use gymd::registry::{RegistryConfig, SessionRegistry};
use gymd::tasks::TaskCatalog;
use gymd_protocol::Action;

/// Task whose close always fails.
pub const CLOSE_FAILS: &str = "CloseFails-v0";
/// Task whose every other reset fails.
pub const FLAKY_RESET: &str = "FlakyReset-v0";
/// Task whose steps pay a NaN reward.
pub const NAN_REWARD: &str = "NanReward-v0";
/// Task whose observations contain infinities.
pub const INF_OBSERVATION: &str = "InfObservation-v0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    CloseFails,
    FlakyReset,
    NanReward,
    InfObservation,
}

/// Environment with an injected failure.
pub struct FaultyEnv {
    fault: Fault,
    resets: usize,
    closes: Arc<AtomicUsize>,
}

impl FaultyEnv {
    fn observation(&self) -> NdArray {
        match self.fault {
            Fault::InfObservation => NdArray::vector(vec![f32::INFINITY, 0.0, f32::NEG_INFINITY]),
            _ => NdArray::vector(vec![0.0; 3]),
        }
    }
}

impl Environment for FaultyEnv {
    fn reset(&mut self, _seed: Option<u64>) -> Result<Reset, EnvError> {
        self.resets += 1;
        if self.fault == Fault::FlakyReset && self.resets % 2 == 1 {
            return Err(EnvError::failed("simulated reset failure"));
        }
        Ok(Reset {
            observation: self.observation(),
            info: Info::new(),
        })
    }

    fn step(&mut self, _action: &Action) -> Result<Step, EnvError> {
        let reward = match self.fault {
            Fault::NanReward => f64::NAN,
            _ => 0.0,
        };
        Ok(Step {
            observation: self.observation(),
            reward: Scalar::F64(reward),
            terminated: false,
            truncated: false,
            info: Info::new(),
        })
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::CloseFails {
            return Err(EnvError::failed("simulated close failure"));
        }
        Ok(())
    }

    fn observation_space(&self) -> Space {
        Space::boxed(vec![3], f64::NEG_INFINITY, f64::INFINITY)
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: 1 }
    }
}

/// Built-in tasks plus the failure-injecting ones. Close calls are counted in
/// the returned counter.
pub fn test_catalog() -> (TaskCatalog, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let mut catalog = TaskCatalog::builtin();
    for (name, fault) in [
        (CLOSE_FAILS, Fault::CloseFails),
        (FLAKY_RESET, Fault::FlakyReset),
        (NAN_REWARD, Fault::NanReward),
        (INF_OBSERVATION, Fault::InfObservation),
    ] {
        let closes = Arc::clone(&closes);
        catalog.register(name, move |_| {
            Ok(Box::new(FaultyEnv {
                fault,
                resets: 0,
                closes: Arc::clone(&closes),
            }))
        });
    }
    (catalog, closes)
}

pub fn test_registry(max_sessions: Option<usize>) -> Arc<SessionRegistry> {
    let (catalog, _) = test_catalog();
    Arc::new(SessionRegistry::new(catalog, RegistryConfig { max_sessions }))
}

/// Create a test application over a fresh registry.
pub fn test_app() -> Router {
    test_app_with(test_registry(None))
}

pub fn test_app_with(registry: Arc<SessionRegistry>) -> Router {
    api::create_router(AppState::new(registry))
}
