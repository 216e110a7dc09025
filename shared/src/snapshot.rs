/// A timestamped pose sample recorded in a buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot<V, W> {
    pub timestamp: f64,
    pub value: V,
    pub velocity: W,
}

/// What happened to a pushed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Sample was inserted at its sorted position. `newest` is true if it
    /// became the highest-timestamp sample in the buffer.
    Inserted { newest: bool },
    /// Sample was older than the oldest retained sample by more than the
    /// retention window and was dropped. Not fatal; callers count it.
    OutOfRetention,
}

impl PushOutcome {
    pub fn is_newest(&self) -> bool {
        matches!(self, PushOutcome::Inserted { newest: true })
    }
}

/// Blend function invoked for a target time bracketed by two samples.
/// Arguments: (before.value, after.value, before.velocity, after.velocity,
/// normalized fraction, after.t - before.t).
pub type BlendFn<V, W> = fn(&V, &V, &W, &W, f64, f64) -> V;

/// Extrapolation function invoked for a target time past the newest
/// sample. Arguments: (newest.value, newest.velocity, elapsed seconds).
pub type AdvanceFn<V, W> = fn(&V, &W, f64) -> V;

/// Tuning knobs for a snapshot buffer.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotConfig {
    /// Maximum retained sample count; the oldest sample is evicted first.
    pub max_count: usize,
    /// Seconds behind the oldest retained sample beyond which a late
    /// sample is dropped instead of inserted.
    pub retention: f64,
    /// Maximum seconds of forward extrapolation past the newest sample.
    /// The elapsed delta is clamped to this horizon.
    pub max_extrapolation: f64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_count: 30,
            retention: 1.0,
            max_extrapolation: 0.25,
        }
    }
}

/// Per-entity ordered buffer of timestamped samples with an interpolation
/// query. Converts a sparse, possibly out-of-order stream of samples into
/// a continuous value function.
///
/// Interpolation math is externalized through the blend/advance functions
/// so scalar buffers can lerp while pose buffers slerp.
pub struct SnapshotBuffer<V: Copy, W: Copy> {
    // ascending by timestamp
    samples: Vec<Snapshot<V, W>>,
    config: SnapshotConfig,
    blend: BlendFn<V, W>,
    advance: AdvanceFn<V, W>,
    locked: bool,
}

impl<V: Copy, W: Copy> SnapshotBuffer<V, W> {
    pub fn new(blend: BlendFn<V, W>, advance: AdvanceFn<V, W>) -> Self {
        Self::with_config(blend, advance, SnapshotConfig::default())
    }

    pub fn with_config(
        blend: BlendFn<V, W>,
        advance: AdvanceFn<V, W>,
        config: SnapshotConfig,
    ) -> Self {
        Self {
            samples: Vec::new(),
            config,
            blend,
            advance,
            locked: false,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Whether the native-replication lock is active. While locked,
    /// `get_at` without `bypass_lock` returns the latest known value
    /// instead of interpolating.
    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Inserts a sample at its sorted position. Out-of-order arrivals are
    /// accepted; a sample is only dropped when it falls behind the oldest
    /// retained sample by more than the retention window.
    pub fn push(&mut self, timestamp: f64, value: V, velocity: W) -> PushOutcome {
        if let Some(oldest) = self.samples.first() {
            if timestamp < oldest.timestamp - self.config.retention {
                return PushOutcome::OutOfRetention;
            }
        }

        let index = self
            .samples
            .partition_point(|s| s.timestamp <= timestamp);
        let newest = index == self.samples.len();

        self.samples.insert(
            index,
            Snapshot {
                timestamp,
                value,
                velocity,
            },
        );

        if self.samples.len() > self.config.max_count {
            self.samples.remove(0);
        }

        PushOutcome::Inserted { newest }
    }

    /// Returns the highest-timestamp sample, or `None` if nothing has been
    /// replicated yet. Callers can distinguish "never replicated" from
    /// "replicated to origin".
    pub fn get_latest(&self) -> Option<&Snapshot<V, W>> {
        self.samples.last()
    }

    pub fn get_oldest(&self) -> Option<&Snapshot<V, W>> {
        self.samples.first()
    }

    /// Returns the newest sample strictly before `at`, if any.
    pub fn get_before(&self, at: f64) -> Option<&Snapshot<V, W>> {
        let index = self.samples.partition_point(|s| s.timestamp < at);
        if index == 0 {
            return None;
        }
        self.samples.get(index - 1)
    }

    /// Returns the interpolated value at `at`, or `None` if no samples
    /// exist.
    ///
    /// Queries past the newest sample extrapolate with the elapsed delta
    /// clamped to `max_extrapolation`; beyond the horizon the value holds
    /// at the clamped advance rather than snapping back to the newest
    /// sample.
    ///
    /// While the replication lock is active and `bypass_lock` is false,
    /// the latest known value is returned without interpolating, letting
    /// an authority force a single authoritative value.
    pub fn get_at(&self, at: f64, bypass_lock: bool) -> Option<V> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;

        if self.locked && !bypass_lock {
            return Some(last.value);
        }

        // Clamp, no extrapolation backward.
        if at <= first.timestamp {
            return Some(first.value);
        }

        if at >= last.timestamp {
            let elapsed = (at - last.timestamp).min(self.config.max_extrapolation);
            if elapsed <= 0.0 {
                return Some(last.value);
            }
            return Some((self.advance)(&last.value, &last.velocity, elapsed));
        }

        // Locate the bracketing pair around `at`.
        let index = self.samples.partition_point(|s| s.timestamp < at);
        let before = &self.samples[index - 1];
        let after = &self.samples[index];

        let dt = after.timestamp - before.timestamp;
        let t = (at - before.timestamp) / dt;

        Some((self.blend)(
            &before.value,
            &after.value,
            &before.velocity,
            &after.velocity,
            t,
            dt,
        ))
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
