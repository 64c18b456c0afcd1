//! Session registry - maps session ids to live environments.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use gymd_protocol::{
    Action, EnvironmentInfo, ResetResponse, SessionState, SessionSummary, StepResponse,
};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::normalize;
use crate::tasks::{Params, TaskCatalog};

use super::error::RegistryError;
use super::models::{RegistryConfig, SessionSlot};

/// Owns every live session.
///
/// Operations on different sessions never contend. Operations on one session
/// run one at a time in lock-acquisition order.
pub struct SessionRegistry {
    catalog: Arc<TaskCatalog>,
    sessions: DashMap<String, Arc<SessionSlot>>,
    /// Sessions created or being created. Bounded by `max_sessions`.
    reserved: AtomicUsize,
    config: RegistryConfig,
}

impl SessionRegistry {
    pub fn new(catalog: TaskCatalog, config: RegistryConfig) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sessions: DashMap::new(),
            reserved: AtomicUsize::new(0),
            config,
        }
    }

    /// Registry over the built-in tasks with no session limit.
    pub fn builtin() -> Self {
        Self::new(TaskCatalog::builtin(), RegistryConfig::default())
    }

    /// Construct an environment and register it under a fresh session id.
    pub async fn create(
        &self,
        task_name: &str,
        params: Params,
    ) -> Result<EnvironmentInfo, RegistryError> {
        self.reserve()?;

        let env = match self.catalog.make(task_name, params) {
            Ok(env) => env,
            Err(e) => {
                self.release();
                debug!("Failed to create environment {}: {}", task_name, e);
                return Err(RegistryError::creation(task_name, e));
            }
        };

        let slot = Arc::new(SessionSlot::new(task_name, env));
        let guard = slot.live.lock().await;
        let session_id = self.insert(Arc::clone(&slot));
        let info = match guard.as_ref() {
            Some(live) => slot.info(&session_id, live),
            None => return Err(RegistryError::not_found(session_id)),
        };
        drop(guard);

        info!("Created session {} for task {}", session_id, task_name);
        Ok(info)
    }

    /// Metadata of a live session.
    pub async fn get(&self, session_id: &str) -> Result<EnvironmentInfo, RegistryError> {
        let slot = self.slot(session_id)?;
        let guard = slot.live.lock().await;
        let live = guard
            .as_ref()
            .ok_or_else(|| RegistryError::not_found(session_id))?;
        Ok(slot.info(session_id, live))
    }

    /// Start a new episode.
    pub async fn reset(
        &self,
        session_id: &str,
        seed: Option<u64>,
    ) -> Result<ResetResponse, RegistryError> {
        let slot = self.slot(session_id)?;
        let mut guard = slot.live.lock().await;
        let live = guard
            .as_mut()
            .ok_or_else(|| RegistryError::not_found(session_id))?;

        let reset = live.env.reset(seed).map_err(|e| {
            warn!("Reset failed for session {}: {}", session_id, e);
            RegistryError::runtime(session_id, "reset", e)
        })?;
        live.state = SessionState::Active;
        live.episodes += 1;

        debug!("Reset session {} (episode {})", session_id, live.episodes);
        Ok(ResetResponse {
            observation: normalize::flatten(&reset.observation),
            info: normalize::info(&reset.info),
        })
    }

    /// Advance one timestep. The action is forwarded as is.
    pub async fn step(
        &self,
        session_id: &str,
        action: &Action,
    ) -> Result<StepResponse, RegistryError> {
        let slot = self.slot(session_id)?;
        let mut guard = slot.live.lock().await;
        let live = guard
            .as_mut()
            .ok_or_else(|| RegistryError::not_found(session_id))?;

        let step = live.env.step(action).map_err(|e| {
            debug!("Step failed for session {}: {}", session_id, e);
            RegistryError::from_step(session_id, e)
        })?;
        live.steps += 1;

        Ok(StepResponse {
            observation: normalize::flatten(&step.observation),
            reward: normalize::reward(step.reward),
            terminated: step.terminated,
            truncated: step.truncated,
            info: normalize::info(&step.info),
        })
    }

    /// Close the environment and remove the session.
    ///
    /// Close failures are logged and otherwise ignored: the session is removed
    /// either way.
    pub async fn delete(&self, session_id: &str) -> Result<(), RegistryError> {
        let slot = self.slot(session_id)?;
        let mut guard = slot.live.lock().await;
        let Some(mut live) = guard.take() else {
            return Err(RegistryError::not_found(session_id));
        };
        slot.mark_terminated();

        if let Err(e) = live.env.close() {
            warn!("Failed to close environment for session {}: {}", session_id, e);
        }
        drop(live);

        self.sessions
            .remove_if(session_id, |_, current| Arc::ptr_eq(current, &slot));
        self.release();
        drop(guard);

        info!("Deleted session {}", session_id);
        Ok(())
    }

    /// Snapshot of live sessions, in no particular order.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_terminated())
            .map(|entry| SessionSummary {
                session_id: entry.key().clone(),
                task_name: entry.value().task_name.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Names of the tasks sessions can be created for, sorted.
    pub fn tasks(&self) -> Vec<String> {
        self.catalog.names()
    }

    /// Delete every session. Returns how many were closed.
    pub async fn shutdown(&self) -> usize {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        let mut closed = 0;
        for id in ids {
            match self.delete(&id).await {
                Ok(()) => closed += 1,
                Err(e) => debug!("Skipping session {} during shutdown: {}", id, e),
            }
        }
        if closed > 0 {
            info!("Closed {} session(s) on shutdown", closed);
        }
        closed
    }

    /// Look up a slot without holding the map reference.
    fn slot(&self, session_id: &str) -> Result<Arc<SessionSlot>, RegistryError> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::not_found(session_id))
    }

    /// Insert under a fresh id, drawing again on collision.
    fn insert(&self, slot: Arc<SessionSlot>) -> String {
        loop {
            let session_id = Uuid::new_v4().to_string();
            match self.sessions.entry(session_id.clone()) {
                Entry::Occupied(_) => {
                    warn!("Session id collision on {}, drawing a new id", session_id);
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(slot);
                    return session_id;
                }
            }
        }
    }

    fn reserve(&self) -> Result<(), RegistryError> {
        let Some(limit) = self.config.max_sessions else {
            self.reserved.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        };
        self.reserved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limit).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                warn!("Session limit of {} reached", limit);
                RegistryError::Capacity { limit }
            })
    }

    fn release(&self) {
        self.reserved.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("catalog", &self.catalog)
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish()
    }
}
