use crate::{
    sampling::Sampler,
    types::{Category, HostEvent},
};

/// What the service should do in response to a host event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Session start; restore every category once
    StartSession,
    /// Back up these categories now
    Backup(Vec<Category>),
    /// A high-frequency event that was not sampled
    SampledOut,
    /// Not relevant to any enabled category
    Ignore,
}

/// Maps live-state mutation events to backups
pub struct ChangeTrigger {
    enabled: Vec<Category>,
    sampler: Box<dyn Sampler>,
}

impl ChangeTrigger {
    pub fn new(enabled: Vec<Category>, sampler: Box<dyn Sampler>) -> Self {
        Self { enabled, sampler }
    }

    fn is_enabled(&self, category: Category) -> bool {
        self.enabled.contains(&category)
    }

    pub fn react(&mut self, event: &HostEvent) -> Reaction {
        match event {
            HostEvent::ConnectionOpen => Reaction::StartSession,
            HostEvent::UserSettingsUpdate => {
                let categories: Vec<_> = Category::SETTINGS
                    .into_iter()
                    .filter(|c| self.is_enabled(*c))
                    .collect();
                if categories.is_empty() {
                    Reaction::Ignore
                } else {
                    Reaction::Backup(categories)
                }
            }
            _ => match event.owning_category() {
                Some(category) if self.is_enabled(category) => {
                    if event.is_high_frequency() && !self.sampler.sample() {
                        Reaction::SampledOut
                    } else {
                        Reaction::Backup(vec![category])
                    }
                }
                _ => Reaction::Ignore,
            },
        }
    }
}
