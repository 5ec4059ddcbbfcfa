use super::ComponentState;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle state of each supervised component, kept in registration order
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    states: Arc<Mutex<Vec<(&'static str, ComponentState)>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register components in the `Stopped` state
    pub fn register(&self, components: &[&'static str]) {
        let mut states = self.states.lock();
        for &component in components {
            if !states.iter().any(|(name, _)| *name == component) {
                states.push((component, ComponentState::Stopped));
            }
        }
    }

    pub fn set(&self, component: &'static str, state: ComponentState) {
        let mut states = self.states.lock();
        match states.iter_mut().find(|(name, _)| *name == component) {
            Some(entry) => entry.1 = state.clone(),
            None => states.push((component, state.clone())),
        }
        debug!("Component '{}' state changed to: {:?}", component, state);
    }

    pub fn get(&self, component: &str) -> Option<ComponentState> {
        self.states
            .lock()
            .iter()
            .find(|(name, _)| *name == component)
            .map(|(_, state)| state.clone())
    }

    pub fn snapshot(&self) -> Vec<(&'static str, ComponentState)> {
        self.states.lock().clone()
    }

    /// Move every component that is not `Failed` to `state`
    pub fn set_all(&self, state: ComponentState) {
        for (name, current) in self.states.lock().iter_mut() {
            if *current != ComponentState::Failed {
                debug!("Component '{}' state changed to: {:?}", name, state);
                *current = state.clone();
            }
        }
    }
}
