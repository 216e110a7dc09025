use std::collections::HashMap;

/// How an entity's attached model tracks replicated poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelReplicationMode {
    /// The engine's own replication moves the model.
    Native,
    /// Native replication, but consumers read only the latest value while
    /// the per-entity lock is held.
    NativeWithLock,
    /// The embedding application positions the model itself.
    Custom,
}

/// Whether player-controlled entities are replicated automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerReplicationMode {
    Automatic,
    Custom,
}

/// Per-entity-type tuning supplied by the embedding application.
/// Read-only to the core once registered.
#[derive(Debug, Clone)]
pub struct EntityTypeConfig {
    /// Seconds of jitter-absorbing interpolation delay for this type.
    pub interp_buffer: f64,
    /// Target fresh-sample rate (samples per second) at NORMAL tick.
    pub tick_rate: f64,
    /// Replicate the full rotation; when false only yaw is sent.
    pub full_rotation: bool,
    /// Whether the authoritative side samples the entity's position
    /// automatically each tick.
    pub auto_update_position: bool,
    /// Whether a snapshot history is kept at all.
    pub store_snapshots: bool,
    pub replication_mode: ModelReplicationMode,
    /// Distance threshold under which the pair ticks at NORMAL rate.
    /// Falls back to the global default when unset.
    pub normal_tick_distance: Option<f32>,
    /// Distance threshold under which the pair ticks at HALF rate.
    /// Falls back to the global default when unset.
    pub half_tick_distance: Option<f32>,
    /// The application interpolates this type itself.
    pub custom_interpolation: bool,
}

impl Default for EntityTypeConfig {
    fn default() -> Self {
        Self {
            interp_buffer: 0.1,
            tick_rate: 20.0,
            full_rotation: false,
            auto_update_position: true,
            store_snapshots: true,
            replication_mode: ModelReplicationMode::Native,
            normal_tick_distance: None,
            half_tick_distance: None,
            custom_interpolation: false,
        }
    }
}

/// Global configuration for the replication system.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Lower clamp on interpolation delay, seconds.
    pub min_buffer: f64,
    /// Upper clamp on interpolation delay, seconds.
    pub max_buffer: f64,
    /// Emit `warn!` logs for dropped/rejected updates.
    pub show_warnings: bool,
    /// Maximum retained samples per entity buffer.
    pub max_snapshot_count: usize,
    pub default_normal_tick_distance: f32,
    pub default_half_tick_distance: f32,
    pub default_replication_mode: ModelReplicationMode,
    pub player_replication: PlayerReplicationMode,
    /// Replicate full rotation by default; types can override.
    pub send_full_rotation: bool,
    /// Per-viewer outbound byte budget per tick; samples past the budget
    /// are culled and counted.
    pub max_bytes_per_frame_per_viewer: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            min_buffer: 0.05,
            max_buffer: 0.3,
            show_warnings: true,
            max_snapshot_count: 30,
            default_normal_tick_distance: 200.0,
            default_half_tick_distance: 400.0,
            default_replication_mode: ModelReplicationMode::Native,
            player_replication: PlayerReplicationMode::Automatic,
            send_full_rotation: false,
            max_bytes_per_frame_per_viewer: 4096,
        }
    }
}

/// Registry of entity-type configurations keyed by type name.
/// Registering an existing name replaces the prior configuration.
pub struct ConfigRegistry {
    pub global: ReplicationConfig,
    types: HashMap<String, EntityTypeConfig>,
    default_type: EntityTypeConfig,
}

impl ConfigRegistry {
    pub fn new(global: ReplicationConfig) -> Self {
        Self {
            global,
            types: HashMap::new(),
            default_type: EntityTypeConfig::default(),
        }
    }

    pub fn register_type(&mut self, name: impl Into<String>, config: EntityTypeConfig) {
        self.types.insert(name.into(), config);
    }

    pub fn get_type(&self, name: &str) -> Option<&EntityTypeConfig> {
        self.types.get(name)
    }

    /// Resolves the configuration for an entity's optional type name,
    /// falling back to the default type config.
    pub fn resolve(&self, name: Option<&str>) -> &EntityTypeConfig {
        name.and_then(|n| self.types.get(n))
            .unwrap_or(&self.default_type)
    }

    /// Resolves (normal, half) tick distance thresholds for a type,
    /// applying global defaults where the type leaves them unset.
    pub fn tick_distances(&self, name: Option<&str>) -> (f32, f32) {
        let config = self.resolve(name);
        (
            config
                .normal_tick_distance
                .unwrap_or(self.global.default_normal_tick_distance),
            config
                .half_tick_distance
                .unwrap_or(self.global.default_half_tick_distance),
        )
    }

    /// Interpolation delay for a type, clamped to the global bounds.
    pub fn interp_delay(&self, name: Option<&str>) -> f64 {
        self.resolve(name)
            .interp_buffer
            .clamp(self.global.min_buffer, self.global.max_buffer)
    }

    /// Whether samples for a type carry the full rotation.
    pub fn full_rotation(&self, name: Option<&str>) -> bool {
        self.resolve(name).full_rotation || self.global.send_full_rotation
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new(ReplicationConfig::default())
    }
}
