use std::mem;

use tempo_shared::{EntityId, ViewerKey};

use crate::scheduler::TickChange;

/// Events the authoritative side accumulates during a tick, drained by
/// the embedding application after each tick.
pub struct ServerEvents {
    viewer_connections: Vec<ViewerKey>,
    viewer_disconnections: Vec<ViewerKey>,
    rejected_updates: Vec<(ViewerKey, EntityId)>,
    tick_changes: Vec<TickChange>,
    ticks: Vec<f64>,
    empty: bool,
}

impl ServerEvents {
    pub(crate) fn new() -> Self {
        Self {
            viewer_connections: Vec::new(),
            viewer_disconnections: Vec::new(),
            rejected_updates: Vec::new(),
            tick_changes: Vec::new(),
            ticks: Vec::new(),
            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn take_viewer_connections(&mut self) -> Vec<ViewerKey> {
        mem::take(&mut self.viewer_connections)
    }

    pub fn take_viewer_disconnections(&mut self) -> Vec<ViewerKey> {
        mem::take(&mut self.viewer_disconnections)
    }

    /// Inbound updates dropped by the middleware pipeline this tick.
    pub fn take_rejected_updates(&mut self) -> Vec<(ViewerKey, EntityId)> {
        mem::take(&mut self.rejected_updates)
    }

    /// Pair tick-rate transitions; fired once per actual change.
    pub fn take_tick_changes(&mut self) -> Vec<TickChange> {
        mem::take(&mut self.tick_changes)
    }

    /// Timestamps of completed ticks.
    pub fn take_ticks(&mut self) -> Vec<f64> {
        mem::take(&mut self.ticks)
    }

    // Crate-public

    pub(crate) fn push_viewer_connection(&mut self, viewer: ViewerKey) {
        self.viewer_connections.push(viewer);
        self.empty = false;
    }

    pub(crate) fn push_viewer_disconnection(&mut self, viewer: ViewerKey) {
        self.viewer_disconnections.push(viewer);
        self.empty = false;
    }

    pub(crate) fn push_rejected_update(&mut self, viewer: ViewerKey, entity: EntityId) {
        self.rejected_updates.push((viewer, entity));
        self.empty = false;
    }

    pub(crate) fn push_tick_changes(&mut self, changes: &mut Vec<TickChange>) {
        if !changes.is_empty() {
            self.tick_changes.append(changes);
            self.empty = false;
        }
    }

    pub(crate) fn push_tick(&mut self, now: f64) {
        self.ticks.push(now);
        self.empty = false;
    }
}
