/// Counters the authoritative tick loop maintains. Aggregation and
/// display live outside the core; these are raw numbers only.
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Live entities at the end of the last tick.
    pub entities: usize,
    /// Pair classifications from the last tick.
    pub full_ticked: u32,
    pub half_ticked: u32,
    pub non_ticked: u32,
    /// Samples culled by the per-viewer byte budget last tick.
    pub culled_by_budget: u32,
    /// Running totals.
    pub samples_sent: u64,
    pub bytes_sent_estimate: u64,
    pub updates_rejected: u64,
    pub updates_out_of_retention: u64,
    /// Exponential moving average of tick duration, milliseconds.
    pub avg_tick_ms: f64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the per-tick counters at the start of a tick.
    pub fn begin_tick(&mut self) {
        self.full_ticked = 0;
        self.half_ticked = 0;
        self.non_ticked = 0;
        self.culled_by_budget = 0;
    }

    pub fn record_tick_ms(&mut self, elapsed_ms: f64) {
        if self.avg_tick_ms == 0.0 {
            self.avg_tick_ms = elapsed_ms;
        } else {
            self.avg_tick_ms = self.avg_tick_ms * 0.9 + elapsed_ms * 0.1;
        }
    }
}
