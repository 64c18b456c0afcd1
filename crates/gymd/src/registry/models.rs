//! Session slot and registry settings.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use gymd_protocol::{EnvironmentInfo, SessionState};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::env::{Environment, Space};

/// Registry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum number of live sessions. Unlimited when unset.
    pub max_sessions: Option<usize>,
}

/// Environment owned by a live session, plus per-session counters.
pub(crate) struct LiveEnv {
    pub env: Box<dyn Environment>,
    pub state: SessionState,
    pub episodes: u64,
    pub steps: u64,
}

/// One registry entry.
///
/// Metadata is fixed at creation. The environment sits behind the slot mutex;
/// `None` means the session was deleted.
pub(crate) struct SessionSlot {
    pub task_name: String,
    pub observation_space: Space,
    pub action_space: Space,
    pub created_at: DateTime<Utc>,
    terminated: AtomicBool,
    pub live: Mutex<Option<LiveEnv>>,
}

impl SessionSlot {
    pub fn new(task_name: &str, env: Box<dyn Environment>) -> Self {
        Self {
            task_name: task_name.to_string(),
            observation_space: env.observation_space(),
            action_space: env.action_space(),
            created_at: Utc::now(),
            terminated: AtomicBool::new(false),
            live: Mutex::new(Some(LiveEnv {
                env,
                state: SessionState::Created,
                episodes: 0,
                steps: 0,
            })),
        }
    }

    /// Set once delete holds the lock. Terminated slots are hidden from listings.
    pub fn mark_terminated(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn info(&self, session_id: &str, live: &LiveEnv) -> EnvironmentInfo {
        EnvironmentInfo {
            session_id: session_id.to_string(),
            task_name: self.task_name.clone(),
            observation_space: self.observation_space.observation_info(),
            action_space: self.action_space.action_info(),
            state: live.state,
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            episodes: live.episodes,
            steps: live.steps,
        }
    }
}
