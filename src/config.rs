use crate::{
    error::{Error, Result},
    identity::IdentityPolicy,
    sampling::{RandomSampler, Sampler},
    types::Category,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Sync service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Name shown as the header of conflict prompts
    pub plugin_name: String,
    /// Categories that are backed up and restored, in restore order
    pub categories: Vec<Category>,
    /// Restore anyway if no session-start event arrived within this delay
    pub fallback_delay_seconds: u64,
    /// Delay between identity polls
    pub identity_poll_interval_ms: u64,
    /// Identity polls before the per-user categories give up
    pub identity_max_attempts: u32,
    /// Fraction of emoji usage events that trigger a backup
    pub usage_sample_rate: f64,
    /// Seed for the usage sampler
    pub sample_seed: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            plugin_name: "PersistFavourites".to_string(),
            categories: Category::ALL.to_vec(),
            fallback_delay_seconds: 10,
            identity_poll_interval_ms: 1000,
            identity_max_attempts: 60,
            usage_sample_rate: 0.1,
            sample_seed: None,
        }
    }
}

impl SyncConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::Config("at least one category must be enabled".to_string()));
        }
        if !(0.0..=1.0).contains(&self.usage_sample_rate) {
            return Err(Error::Config(format!(
                "usage_sample_rate must be within [0, 1], got {}",
                self.usage_sample_rate
            )));
        }
        if self.identity_max_attempts == 0 {
            return Err(Error::Config("identity_max_attempts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_secs(self.fallback_delay_seconds)
    }

    pub fn identity_policy(&self) -> IdentityPolicy {
        IdentityPolicy {
            poll_interval: Duration::from_millis(self.identity_poll_interval_ms),
            max_attempts: self.identity_max_attempts,
        }
    }

    /// Sampler for emoji usage events
    pub fn usage_sampler(&self) -> Box<dyn Sampler> {
        match self.sample_seed {
            Some(seed) => Box::new(RandomSampler::seeded(self.usage_sample_rate, seed)),
            None => Box::new(RandomSampler::new(self.usage_sample_rate)),
        }
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}
