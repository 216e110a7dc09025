/// Counters the observer-side frame loop maintains. Aggregation and
/// display live outside the core.
#[derive(Debug, Clone, Default)]
pub struct ClientStats {
    /// Live entities at the end of the last frame.
    pub total_entities: usize,
    /// Entities whose interpolated pose was queried this frame.
    pub entities_checked_this_frame: u32,
    /// Applied samples that became the newest entry this frame.
    pub entities_moved_this_frame: u32,
    /// Running totals.
    pub samples_applied: u64,
    pub samples_out_of_retention: u64,
    /// Exponential moving average of per-frame apply+interpolation time,
    /// milliseconds.
    pub avg_interpolation_ms: f64,
}

impl ClientStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.entities_checked_this_frame = 0;
        self.entities_moved_this_frame = 0;
    }

    pub fn record_frame_ms(&mut self, elapsed_ms: f64) {
        if self.avg_interpolation_ms == 0.0 {
            self.avg_interpolation_ms = elapsed_ms;
        } else {
            self.avg_interpolation_ms = self.avg_interpolation_ms * 0.9 + elapsed_ms * 0.1;
        }
    }
}
