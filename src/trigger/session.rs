use serde::{Deserialize, Serialize};
use tracing::debug;

/// Restore state of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No restore has run yet
    Waiting,
    /// Restore ran; terminal until the next session
    Restored,
}

/// What started the restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestoreSource {
    /// The host's session-start event
    SessionStart,
    /// The fallback delay elapsed first
    FallbackTimer,
}

/// Guards the once-per-session restore
#[derive(Debug, Clone)]
pub struct SessionTrigger {
    state: SessionState,
    restored_by: Option<RestoreSource>,
}

impl SessionTrigger {
    pub fn new() -> Self {
        Self {
            state: SessionState::Waiting,
            restored_by: None,
        }
    }

    /// Record an arrival of `source`; true only for the first one
    pub fn fire(&mut self, source: RestoreSource) -> bool {
        match self.state {
            SessionState::Waiting => {
                self.state = SessionState::Restored;
                self.restored_by = Some(source);
                true
            }
            SessionState::Restored => {
                debug!("Ignoring {:?}, session already restored", source);
                false
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn did_restore(&self) -> bool {
        self.state == SessionState::Restored
    }

    pub fn restored_by(&self) -> Option<RestoreSource> {
        self.restored_by
    }
}

impl Default for SessionTrigger {
    fn default() -> Self {
        Self::new()
    }
}
