/// Identifies an observing participant (a connected player/viewer).
///
/// Keys are handed to the core by the transport collaborator and are only
/// ever compared/hashed, never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerKey(u64);

impl ViewerKey {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ViewerKey {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// How often fresh samples are produced for a given (entity, viewer) pair.
///
/// `Normal` emits a sample every scheduler tick, `Half` every other tick,
/// `None` relies purely on extrapolation from last-known state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickRate {
    None,
    Half,
    Normal,
}

/// Which clock a time value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockDomain {
    /// The authoritative simulation's clock.
    Authoritative,
    /// A viewer's local clock.
    Viewer,
}
