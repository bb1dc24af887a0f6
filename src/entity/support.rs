use super::RelatedMany;
use crate::core::EntityId;
use serde::{Deserialize, Serialize};

/// State shared by every repository object: identity plus the alias,
/// policy and metadata collections.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    pub id: EntityId,
    pub handles: RelatedMany<Handle>,
    pub resource_policies: RelatedMany<ResourcePolicy>,
    /// Mapped with cascade-all: evicted together with the owning object.
    pub metadata: RelatedMany<MetadataValue>,
}

impl ObjectCore {
    pub fn new() -> Self {
        Self::with_id(EntityId::new())
    }

    pub fn with_id(id: EntityId) -> Self {
        Self {
            id,
            handles: RelatedMany::empty(),
            resource_policies: RelatedMany::empty(),
            metadata: RelatedMany::empty(),
        }
    }

    pub fn unloaded(&self) -> Self {
        Self {
            id: self.id,
            handles: self.handles.unload(),
            resource_policies: self.resource_policies.unload(),
            metadata: self.metadata.unload(),
        }
    }
}

impl Default for ObjectCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Persistent external identifier alias, e.g. `123456789/42`.
#[derive(Debug, Clone)]
pub struct Handle {
    pub id: EntityId,
    pub handle: String,
}

impl Handle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            handle: handle.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Read,
    Write,
    Add,
    Remove,
    Delete,
    Admin,
}

#[derive(Debug, Clone)]
pub struct ResourcePolicy {
    pub id: EntityId,
    pub action: Action,
    pub group_id: Option<EntityId>,
    pub eperson_id: Option<EntityId>,
}

impl ResourcePolicy {
    pub fn for_group(action: Action, group_id: EntityId) -> Self {
        Self {
            id: EntityId::new(),
            action,
            group_id: Some(group_id),
            eperson_id: None,
        }
    }

    pub fn for_eperson(action: Action, eperson_id: EntityId) -> Self {
        Self {
            id: EntityId::new(),
            action,
            group_id: None,
            eperson_id: Some(eperson_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataValue {
    pub id: EntityId,
    pub field: String,
    pub value: String,
    pub place: u32,
}

impl MetadataValue {
    pub fn new(field: impl Into<String>, value: impl Into<String>, place: u32) -> Self {
        Self {
            id: EntityId::new(),
            field: field.into(),
            value: value.into(),
            place,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EPerson {
    pub core: ObjectCore,
    pub email: String,
}

impl EPerson {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            core: ObjectCore::new(),
            email: email.into(),
        }
    }

    pub fn unloaded(&self) -> Self {
        Self {
            core: self.core.unloaded(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub core: ObjectCore,
    pub name: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ObjectCore::new(),
            name: name.into(),
        }
    }

    pub fn unloaded(&self) -> Self {
        Self {
            core: self.core.unloaded(),
            name: self.name.clone(),
        }
    }
}
