use tempo_shared::{EntityId, Pose, ViewerKey};

/// An inbound pose update as delivered by the transport collaborator.
#[derive(Debug, Clone, Copy)]
pub struct InboundUpdate {
    pub viewer: ViewerKey,
    pub entity: EntityId,
    pub pose: Pose,
    /// Timestamp in the sender's local clock domain.
    pub timestamp: f64,
    /// Arrival time in the receiver's clock domain.
    pub arrival_time: f64,
}

/// Interceptor function. Returning `false` rejects the update and aborts
/// the chain.
pub type MiddlewareFn = Box<dyn FnMut(&InboundUpdate) -> bool + Send>;

struct MiddlewareEntry {
    name: String,
    priority: i32,
    func: MiddlewareFn,
}

/// Ordered, priority-sorted chain of interceptors that validate or reject
/// inbound pose updates before they are committed to a snapshot buffer.
///
/// Lower priorities run first. Names are unique: registering a duplicate
/// name replaces the existing entry's function and priority in place, so
/// the pipeline never executes an interceptor twice. This is the sole
/// authorized place for server-side validation; interceptors must not
/// block, long-running checks belong in pre-computed state.
pub struct MiddlewarePipeline {
    // kept sorted by priority ascending
    entries: Vec<MiddlewareEntry>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers an interceptor under a unique name. An existing entry
    /// with the same name is replaced rather than duplicated.
    pub fn register(&mut self, name: impl Into<String>, priority: i32, func: MiddlewareFn) {
        let name = name.into();

        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.priority = priority;
            entry.func = func;
        } else {
            self.entries.push(MiddlewareEntry {
                name,
                priority,
                func,
            });
        }

        // Stable: entries sharing a priority keep registration order.
        self.entries.sort_by_key(|e| e.priority);
    }

    /// Removes an interceptor by name. Returns false if absent.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every interceptor in priority order. The first rejection
    /// aborts the chain; remaining entries do not run.
    pub fn evaluate(&mut self, update: &InboundUpdate) -> bool {
        for entry in &mut self.entries {
            if !(entry.func)(update) {
                return false;
            }
        }
        true
    }
}

impl Default for MiddlewarePipeline {
    fn default() -> Self {
        Self::new()
    }
}
