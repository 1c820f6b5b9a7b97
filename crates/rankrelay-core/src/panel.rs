// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Status panels, mounted at most once per identifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifier of the collection panel shown on a ranking page.
pub const DEFAULT_PANEL_ID: &str = "xhs-note-rank-panel";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PanelState {
    status: String,
    row_count: usize,
}

/// User-visible status line plus the cached buffer size.
#[derive(Debug, Default)]
pub struct StatusPanel {
    id: String,
    state: Mutex<PanelState>,
}

impl StatusPanel {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: Mutex::new(PanelState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> MutexGuard<'_, PanelState> {
        // A poisoned status line is still a status line.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_status(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(panel = %self.id, status = %text, "status");
        self.state().status = text;
    }

    pub fn status(&self) -> String {
        self.state().status.clone()
    }

    pub fn set_row_count(&self, count: usize) {
        self.state().row_count = count;
    }

    pub fn row_count(&self) -> usize {
        self.state().row_count
    }
}

/// Registry of mounted panels keyed by identifier.
#[derive(Debug, Default)]
pub struct PanelRegistry {
    panels: Mutex<HashMap<String, Arc<StatusPanel>>>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the panel mounted under `id`, creating it on first use.
    pub fn mount(&self, id: &str) -> Arc<StatusPanel> {
        let mut panels = self.panels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = panels.get(id) {
            return Arc::clone(existing);
        }
        tracing::debug!(panel = id, "mounting panel");
        let panel = Arc::new(StatusPanel::new(id));
        panels.insert(id.to_string(), Arc::clone(&panel));
        panel
    }

    pub fn get(&self, id: &str) -> Option<Arc<StatusPanel>> {
        self.panels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.panels.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_is_idempotent() {
        let registry = PanelRegistry::new();
        let first = registry.mount(DEFAULT_PANEL_ID);
        let second = registry.mount(DEFAULT_PANEL_ID);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_ids_get_distinct_panels() {
        let registry = PanelRegistry::new();
        let a = registry.mount("a");
        let b = registry.mount("b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_status_survives_remount() {
        let registry = PanelRegistry::new();
        registry.mount(DEFAULT_PANEL_ID).set_status("Cache cleared.");
        registry.mount(DEFAULT_PANEL_ID).set_row_count(4);

        let panel = registry.mount(DEFAULT_PANEL_ID);
        assert_eq!(panel.status(), "Cache cleared.");
        assert_eq!(panel.row_count(), 4);
        assert_eq!(panel.id(), DEFAULT_PANEL_ID);
    }
}
