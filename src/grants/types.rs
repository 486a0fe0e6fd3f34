use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::resources::ResourceName;

pub type ConsumerName = String;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    AdminAction(String),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::ReadOnly => f.write_str("read_only"),
            Capability::WriteOnly => f.write_str("write_only"),
            Capability::ReadWrite => f.write_str("read_write"),
            Capability::AdminAction(action) => write!(f, "admin_action({})", action),
        }
    }
}

/// Normalized capability set. `ReadWrite` is stored as read + write so that
/// unions commute regardless of how the capabilities were spelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    pub read: bool,
    pub write: bool,
    pub admin_actions: BTreeSet<String>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        match capability {
            Capability::ReadOnly => !std::mem::replace(&mut self.read, true),
            Capability::WriteOnly => !std::mem::replace(&mut self.write, true),
            Capability::ReadWrite => {
                let changed = !self.read || !self.write;
                self.read = true;
                self.write = true;
                changed
            }
            Capability::AdminAction(action) => self.admin_actions.insert(action),
        }
    }

    /// Set union; returns whether `self` grew.
    pub fn union(&mut self, other: &CapabilitySet) -> bool {
        let mut changed = false;
        if other.read && !self.read {
            self.read = true;
            changed = true;
        }
        if other.write && !self.write {
            self.write = true;
            changed = true;
        }
        for action in &other.admin_actions {
            changed |= self.admin_actions.insert(action.clone());
        }
        changed
    }

    pub fn is_empty(&self) -> bool {
        !self.read && !self.write && self.admin_actions.is_empty()
    }

    pub fn has_data_access(&self) -> bool {
        self.read || self.write
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        match capability {
            Capability::ReadOnly => self.read,
            Capability::WriteOnly => self.write,
            Capability::ReadWrite => self.read && self.write,
            Capability::AdminAction(action) => self.admin_actions.contains(action),
        }
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        let mut items = Vec::new();
        match (self.read, self.write) {
            (true, true) => items.push(Capability::ReadWrite),
            (true, false) => items.push(Capability::ReadOnly),
            (false, true) => items.push(Capability::WriteOnly),
            (false, false) => {}
        }
        items.extend(self.admin_actions.iter().cloned().map(Capability::AdminAction));
        items
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        let mut set = CapabilitySet::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
}

/// Provider-native permission statement for one capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

/// One (resource, consumer) edge as attached to the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessStatement {
    pub resource: ResourceName,
    pub consumer: ConsumerName,
    pub capabilities: CapabilitySet,
    pub statement: PolicyStatement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceExports {
    pub external_identifier: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantResult {
    pub resource: ResourceName,
    pub consumer: ConsumerName,
    /// Capabilities held after the merge.
    pub capabilities: CapabilitySet,
    pub changed: bool,
    pub exports: ResourceExports,
}
