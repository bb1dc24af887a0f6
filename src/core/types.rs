use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a persistent record.
///
/// Immutable for the lifetime of the record and unique within its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        EntityId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        EntityId(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        EntityId(uuid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Item,
    Bundle,
    Bitstream,
    Community,
    Collection,
    EPerson,
    Group,
    Handle,
    ResourcePolicy,
    MetadataValue,
}

impl EntityKind {
    /// Kinds that carry handles, resource policies and metadata.
    pub fn is_repository_object(&self) -> bool {
        !matches!(
            self,
            EntityKind::Handle | EntityKind::ResourcePolicy | EntityKind::MetadataValue
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Item => "Item",
            EntityKind::Bundle => "Bundle",
            EntityKind::Bitstream => "Bitstream",
            EntityKind::Community => "Community",
            EntityKind::Collection => "Collection",
            EntityKind::EPerson => "EPerson",
            EntityKind::Group => "Group",
            EntityKind::Handle => "Handle",
            EntityKind::ResourcePolicy => "ResourcePolicy",
            EntityKind::MetadataValue => "MetadataValue",
        };
        f.write_str(name)
    }
}

/// Identity-cache key: identifiers are only unique within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}
