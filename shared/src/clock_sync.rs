use std::collections::HashMap;

use thiserror::Error;

use crate::types::{ClockDomain, ViewerKey};

/// Errors that can occur during clock conversion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockSyncError {
    /// Conversion requested for a viewer with no stored sync record.
    /// The caller must re-sync before converting; a silent pass-through
    /// would mis-time interpolation.
    #[error("No clock record stored for viewer {viewer} - re-sync before converting")]
    UnknownViewer { viewer: u64 },

    /// The observer-side clock has not received a sync message yet.
    #[error("Clock has not been synchronized with the authoritative side yet")]
    NotSynced,
}

/// A (local_clock_sample, authoritative_clock_sample) pair captured at a
/// sync event, plus the derived offset = authoritative - local.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockRecord {
    pub local_sample: f64,
    pub authoritative_sample: f64,
    pub offset: f64,
}

impl ClockRecord {
    fn new(local_sample: f64, authoritative_sample: f64) -> Self {
        Self {
            local_sample,
            authoritative_sample,
            offset: authoritative_sample - local_sample,
        }
    }
}

/// Per-viewer clock offsets on the authoritative side.
///
/// Last-write-wins per viewer: each sync message replaces the stored
/// record, no averaging or smoothing.
pub struct ClockSyncStore {
    records: HashMap<ViewerKey, ClockRecord>,
}

impl ClockSyncStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Records or updates the sync sample for a viewer. `local_sample` is
    /// the viewer's clock reading carried in the sync message,
    /// `authoritative_sample` is the authoritative clock at arrival.
    pub fn store(&mut self, viewer: ViewerKey, local_sample: f64, authoritative_sample: f64) {
        self.records
            .insert(viewer, ClockRecord::new(local_sample, authoritative_sample));
    }

    pub fn contains(&self, viewer: &ViewerKey) -> bool {
        self.records.contains_key(viewer)
    }

    pub fn record(&self, viewer: &ViewerKey) -> Option<&ClockRecord> {
        self.records.get(viewer)
    }

    /// Converts `time` into the requested clock domain for a viewer.
    ///
    /// With offset = authoritative - local, converting into the
    /// authoritative domain adds the offset and converting into the
    /// viewer's domain subtracts it; a round-trip is the identity.
    pub fn convert_to(
        &self,
        viewer: &ViewerKey,
        time: f64,
        domain: ClockDomain,
    ) -> Result<f64, ClockSyncError> {
        let record = self
            .records
            .get(viewer)
            .ok_or(ClockSyncError::UnknownViewer {
                viewer: viewer.to_u64(),
            })?;

        match domain {
            ClockDomain::Authoritative => Ok(time + record.offset),
            ClockDomain::Viewer => Ok(time - record.offset),
        }
    }

    /// Deletes the record for a disconnecting viewer.
    pub fn remove(&mut self, viewer: &ViewerKey) -> Option<ClockRecord> {
        self.records.remove(viewer)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ClockSyncStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The observer-side mirror: a single offset to the authoritative clock,
/// updated on every sync message from the authoritative side.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteClock {
    offset: Option<f64>,
}

impl RemoteClock {
    pub fn new() -> Self {
        Self { offset: None }
    }

    pub fn is_synced(&self) -> bool {
        self.offset.is_some()
    }

    /// Stores the offset derived from a sync exchange. `local_sample` is
    /// this side's clock, `authoritative_sample` the remote clock reading.
    pub fn sync(&mut self, local_sample: f64, authoritative_sample: f64) {
        self.offset = Some(authoritative_sample - local_sample);
    }

    /// Maps a local clock reading into the authoritative domain.
    pub fn to_authoritative(&self, local_time: f64) -> Result<f64, ClockSyncError> {
        let offset = self.offset.ok_or(ClockSyncError::NotSynced)?;
        Ok(local_time + offset)
    }

    /// Maps an authoritative clock reading into the local domain.
    pub fn to_local(&self, authoritative_time: f64) -> Result<f64, ClockSyncError> {
        let offset = self.offset.ok_or(ClockSyncError::NotSynced)?;
        Ok(authoritative_time - offset)
    }
}
