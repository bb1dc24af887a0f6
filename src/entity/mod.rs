// ============================================================================
// Entity Model
// ============================================================================
//
// The typed object graph the session caches. Every persistent object is
// identified by an `EntityKey` (kind + id). Cross references are either
// materialized (`Loaded`) or known only by identifier (`Unloaded`).
//
// `Entity` is the closed set of kinds the session manager understands; the
// eviction walker dispatches on it instead of inspecting runtime types.
//
// ============================================================================

pub mod content;
pub mod related;
pub mod support;

pub use content::{Bitstream, Bundle, Collection, Community, Item};
pub use related::{Related, RelatedMany};
pub use support::{Action, EPerson, Group, Handle, MetadataValue, ObjectCore, ResourcePolicy};

use crate::core::{EntityId, EntityKey, EntityKind};
use std::sync::Arc;

/// A persistent object with a stable identity that a session can re-attach
/// from its cache or reload from storage.
pub trait ReloadableEntity {
    fn id(&self) -> EntityId;

    fn kind(&self) -> EntityKind;

    fn key(&self) -> EntityKey {
        EntityKey::new(self.kind(), self.id())
    }
}

/// Concrete entity types that can be wrapped into and recovered from `Entity`.
pub trait EntityType: ReloadableEntity + Send + Sync + Sized + 'static {
    const KIND: EntityKind;

    fn into_entity(this: Arc<Self>) -> Entity;

    fn from_entity(entity: Entity) -> Option<Arc<Self>>;
}

#[derive(Debug, Clone)]
pub enum Entity {
    Item(Arc<Item>),
    Bundle(Arc<Bundle>),
    Bitstream(Arc<Bitstream>),
    Community(Arc<Community>),
    Collection(Arc<Collection>),
    EPerson(Arc<EPerson>),
    Group(Arc<Group>),
    Handle(Arc<Handle>),
    ResourcePolicy(Arc<ResourcePolicy>),
    MetadataValue(Arc<MetadataValue>),
}

macro_rules! entity_types {
    ($($variant:ident => $($id:ident).+;)*) => {
        $(
            impl ReloadableEntity for $variant {
                fn id(&self) -> EntityId {
                    self.$($id).+
                }

                fn kind(&self) -> EntityKind {
                    EntityKind::$variant
                }
            }

            impl EntityType for $variant {
                const KIND: EntityKind = EntityKind::$variant;

                fn into_entity(this: Arc<Self>) -> Entity {
                    Entity::$variant(this)
                }

                fn from_entity(entity: Entity) -> Option<Arc<Self>> {
                    match entity {
                        Entity::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*

        impl Entity {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Entity::$variant(_) => EntityKind::$variant,)*
                }
            }

            pub fn id(&self) -> EntityId {
                match self {
                    $(Entity::$variant(inner) => inner.$($id).+,)*
                }
            }

            /// Same instance check: both values point at one in-memory object.
            pub fn ptr_eq(&self, other: &Entity) -> bool {
                match (self, other) {
                    $((Entity::$variant(a), Entity::$variant(b)) => Arc::ptr_eq(a, b),)*
                    _ => false,
                }
            }
        }
    };
}

entity_types! {
    Item => core.id;
    Bundle => core.id;
    Bitstream => core.id;
    Community => core.id;
    Collection => core.id;
    EPerson => core.id;
    Group => core.id;
    Handle => id;
    ResourcePolicy => id;
    MetadataValue => id;
}

impl<T: EntityType> From<Arc<T>> for Entity {
    fn from(value: Arc<T>) -> Self {
        T::into_entity(value)
    }
}

impl ReloadableEntity for Entity {
    fn id(&self) -> EntityId {
        Entity::id(self)
    }

    fn kind(&self) -> EntityKind {
        Entity::kind(self)
    }
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.kind(), self.id())
    }

    /// Shared repository-object state, for kinds that have it.
    pub fn core(&self) -> Option<&ObjectCore> {
        match self {
            Entity::Item(item) => Some(&item.core),
            Entity::Bundle(bundle) => Some(&bundle.core),
            Entity::Bitstream(bitstream) => Some(&bitstream.core),
            Entity::Community(community) => Some(&community.core),
            Entity::Collection(collection) => Some(&collection.core),
            Entity::EPerson(eperson) => Some(&eperson.core),
            Entity::Group(group) => Some(&group.core),
            Entity::Handle(_) | Entity::ResourcePolicy(_) | Entity::MetadataValue(_) => None,
        }
    }

    /// Already-materialized related entities that eviction recurses into.
    ///
    /// Unloaded relations are skipped without being touched. Metadata values
    /// are cascade-all and left to the session's own eviction.
    pub fn materialized_relations(&self) -> Vec<Entity> {
        let mut out = Vec::new();

        if let Some(core) = self.core() {
            push_many(&mut out, &core.handles);
            push_many(&mut out, &core.resource_policies);
        }

        match self {
            Entity::Item(item) => {
                push_one(&mut out, &item.submitter);
                push_many(&mut out, &item.bundles);
            }
            Entity::Bundle(bundle) => {
                push_many(&mut out, &bundle.bitstreams);
            }
            Entity::Community(community) => {
                push_one(&mut out, &community.administrators);
                push_one(&mut out, &community.logo);
            }
            Entity::Collection(collection) => {
                push_one(&mut out, &collection.logo);
                push_one(&mut out, &collection.administrators);
                push_one(&mut out, &collection.submitters);
                push_one(&mut out, &collection.template_item);
                for step in collection.workflow_steps() {
                    push_one(&mut out, step);
                }
            }
            _ => {}
        }

        out
    }

    /// Entities whose cache lifetime is bound to this one (cascade-all).
    pub fn cascaded(&self) -> Vec<Entity> {
        let mut out = Vec::new();
        if let Some(core) = self.core() {
            push_many(&mut out, &core.metadata);
        }
        out
    }

    /// The form a fresh load from storage yields: every relation reduced to
    /// its identifier.
    pub fn unloaded(&self) -> Entity {
        match self {
            Entity::Item(item) => Entity::Item(Arc::new(item.unloaded())),
            Entity::Bundle(bundle) => Entity::Bundle(Arc::new(bundle.unloaded())),
            Entity::Bitstream(bitstream) => Entity::Bitstream(Arc::new(bitstream.unloaded())),
            Entity::Community(community) => Entity::Community(Arc::new(community.unloaded())),
            Entity::Collection(collection) => {
                Entity::Collection(Arc::new(collection.unloaded()))
            }
            Entity::EPerson(eperson) => Entity::EPerson(Arc::new(eperson.unloaded())),
            Entity::Group(group) => Entity::Group(Arc::new(group.unloaded())),
            Entity::Handle(_) | Entity::ResourcePolicy(_) | Entity::MetadataValue(_) => {
                self.clone()
            }
        }
    }
}

fn push_one<T: EntityType>(out: &mut Vec<Entity>, relation: &Related<T>) {
    if relation.is_initialized() {
        if let Some(target) = relation.get() {
            out.push(T::into_entity(Arc::clone(target)));
        }
    }
}

fn push_many<T: EntityType>(out: &mut Vec<Entity>, relation: &RelatedMany<T>) {
    if relation.is_initialized() {
        out.extend(relation.iter().map(|target| T::into_entity(Arc::clone(target))));
    }
}
