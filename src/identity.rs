use crate::{
    error::{Error, Result},
    host::IdentitySource,
};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::debug;

/// Polling policy for identity resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityPolicy {
    /// Delay between polls
    pub poll_interval: Duration,
    /// Polls before giving up
    pub max_attempts: u32,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

/// Waits for the host to populate the current user
///
/// The user is frequently still unset when the session-start event fires,
/// so per-user categories resolve it through this waiter.
#[derive(Clone)]
pub struct IdentityWaiter {
    source: Arc<dyn IdentitySource>,
    policy: IdentityPolicy,
}

impl IdentityWaiter {
    pub fn new(source: Arc<dyn IdentitySource>, policy: IdentityPolicy) -> Self {
        Self { source, policy }
    }

    /// Id of the current user, polling until it is available
    pub async fn wait(&self) -> Result<String> {
        for attempt in 1..=self.policy.max_attempts {
            if let Some(user) = self.source.current_user().await {
                if !user.id.is_empty() {
                    return Ok(user.id);
                }
            }
            if attempt < self.policy.max_attempts {
                debug!("Current user not available yet (attempt {})", attempt);
                sleep(self.policy.poll_interval).await;
            }
        }

        Err(Error::IdentityTimeout {
            attempts: self.policy.max_attempts,
        })
    }
}
