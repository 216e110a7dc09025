use std::collections::{HashMap, HashSet};

use tempo_shared::{EntityId, ViewerKey};

/// Dynamic visibility predicate over (entity, viewer, viewer's own entity
/// handle if they have one).
pub type RulePredicate = Box<dyn Fn(EntityId, ViewerKey, Option<EntityId>) -> bool + Send + Sync>;

/// Semantics of a static viewer-set rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Allowed iff the viewer is in the set.
    Include,
    /// Allowed iff the viewer is NOT in the set.
    Exclude,
}

/// A visibility rule: either a static viewer-set filter or a dynamic
/// predicate. Tagged variant rather than call-shape inspection.
pub enum ReplicationRule {
    Static {
        mode: FilterMode,
        viewers: HashSet<ViewerKey>,
    },
    Dynamic(RulePredicate),
}

impl ReplicationRule {
    pub fn include(viewers: impl IntoIterator<Item = ViewerKey>) -> Self {
        Self::Static {
            mode: FilterMode::Include,
            viewers: viewers.into_iter().collect(),
        }
    }

    pub fn exclude(viewers: impl IntoIterator<Item = ViewerKey>) -> Self {
        Self::Static {
            mode: FilterMode::Exclude,
            viewers: viewers.into_iter().collect(),
        }
    }

    pub fn dynamic(
        predicate: impl Fn(EntityId, ViewerKey, Option<EntityId>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Dynamic(Box::new(predicate))
    }

    pub fn allows(
        &self,
        entity: EntityId,
        viewer: ViewerKey,
        viewer_entity: Option<EntityId>,
    ) -> bool {
        match self {
            ReplicationRule::Static { mode, viewers } => match mode {
                FilterMode::Include => viewers.contains(&viewer),
                FilterMode::Exclude => !viewers.contains(&viewer),
            },
            ReplicationRule::Dynamic(predicate) => predicate(entity, viewer, viewer_entity),
        }
    }
}

/// What a rule applies to. At most one rule is active per target; setting
/// a new rule replaces the prior one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleTarget {
    Entity(EntityId),
    /// Keyed by entity type name.
    Model(String),
    Global,
}

/// Decides visibility of an entity to a viewer. Precedence: exact-entity
/// rule, then model/type rule, then global rule, then default-allow.
pub struct ReplicationRules {
    entity_rules: HashMap<EntityId, ReplicationRule>,
    model_rules: HashMap<String, ReplicationRule>,
    global_rule: Option<ReplicationRule>,
}

impl ReplicationRules {
    pub fn new() -> Self {
        Self {
            entity_rules: HashMap::new(),
            model_rules: HashMap::new(),
            global_rule: None,
        }
    }

    /// Sets the rule for a target, replacing any prior rule. `None`
    /// clears the rule and reverts the target to default-allow.
    pub fn set_rule(&mut self, target: RuleTarget, rule: Option<ReplicationRule>) {
        match (target, rule) {
            (RuleTarget::Entity(id), Some(rule)) => {
                self.entity_rules.insert(id, rule);
            }
            (RuleTarget::Entity(id), None) => {
                self.entity_rules.remove(&id);
            }
            (RuleTarget::Model(name), Some(rule)) => {
                self.model_rules.insert(name, rule);
            }
            (RuleTarget::Model(name), None) => {
                self.model_rules.remove(&name);
            }
            (RuleTarget::Global, rule) => {
                self.global_rule = rule;
            }
        }
    }

    /// Drops every rule that names an entity directly. Used when an
    /// entity is destroyed.
    pub fn forget_entity(&mut self, id: &EntityId) {
        self.entity_rules.remove(id);
    }

    pub fn allows(
        &self,
        entity: EntityId,
        type_name: Option<&str>,
        viewer: ViewerKey,
        viewer_entity: Option<EntityId>,
    ) -> bool {
        if let Some(rule) = self.entity_rules.get(&entity) {
            return rule.allows(entity, viewer, viewer_entity);
        }
        if let Some(rule) = type_name.and_then(|n| self.model_rules.get(n)) {
            return rule.allows(entity, viewer, viewer_entity);
        }
        if let Some(rule) = &self.global_rule {
            return rule.allows(entity, viewer, viewer_entity);
        }
        true
    }
}

impl Default for ReplicationRules {
    fn default() -> Self {
        Self::new()
    }
}
