use super::{ClickcamOrchestrator, ComponentState};
use std::collections::HashMap;
use tracing::debug;

impl ClickcamOrchestrator {
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let previous = self
            .component_states
            .lock()
            .await
            .insert(component.to_string(), state);

        if previous != Some(state) {
            debug!("{}: {:?} -> {:?}", component, previous, state);
        }
    }

    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().await.get(component).copied()
    }

    /// Snapshot of every registered component
    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        self.component_states.lock().await.clone()
    }
}
