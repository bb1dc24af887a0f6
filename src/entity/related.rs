use super::ReloadableEntity;
use crate::core::EntityId;
use std::sync::Arc;

/// Single-valued reference to another entity.
///
/// `Unloaded` means only the identifier is known; the target has not been
/// materialized and must not be loaded just to inspect it.
#[derive(Debug)]
pub enum Related<T> {
    Absent,
    Unloaded(EntityId),
    Loaded(Arc<T>),
}

impl<T> Related<T> {
    pub fn absent() -> Self {
        Related::Absent
    }

    pub fn unloaded(id: EntityId) -> Self {
        Related::Unloaded(id)
    }

    pub fn loaded(target: Arc<T>) -> Self {
        Related::Loaded(target)
    }

    /// True when reading the reference cannot trigger a load.
    ///
    /// An absent reference counts as initialized.
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Related::Unloaded(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Related::Absent)
    }

    /// The materialized target, if any.
    pub fn get(&self) -> Option<&Arc<T>> {
        match self {
            Related::Loaded(target) => Some(target),
            _ => None,
        }
    }
}

impl<T: ReloadableEntity> Related<T> {
    pub fn target_id(&self) -> Option<EntityId> {
        match self {
            Related::Absent => None,
            Related::Unloaded(id) => Some(*id),
            Related::Loaded(target) => Some(target.id()),
        }
    }

    /// Reduce to the identifier-only form a fresh load produces.
    pub fn unload(&self) -> Self {
        match self.target_id() {
            Some(id) => Related::Unloaded(id),
            None => Related::Absent,
        }
    }
}

impl<T> Clone for Related<T> {
    fn clone(&self) -> Self {
        match self {
            Related::Absent => Related::Absent,
            Related::Unloaded(id) => Related::Unloaded(*id),
            Related::Loaded(target) => Related::Loaded(Arc::clone(target)),
        }
    }
}

impl<T> Default for Related<T> {
    fn default() -> Self {
        Related::Absent
    }
}

/// Collection-valued relation.
#[derive(Debug)]
pub enum RelatedMany<T> {
    Unloaded,
    Loaded(Vec<Arc<T>>),
}

impl<T> RelatedMany<T> {
    pub fn empty() -> Self {
        RelatedMany::Loaded(Vec::new())
    }

    pub fn loaded(targets: Vec<Arc<T>>) -> Self {
        RelatedMany::Loaded(targets)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self, RelatedMany::Loaded(_))
    }

    /// Materialized targets; empty when the collection is not loaded.
    pub fn as_slice(&self) -> &[Arc<T>] {
        match self {
            RelatedMany::Loaded(targets) => targets,
            RelatedMany::Unloaded => &[],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.as_slice().iter()
    }

    pub fn unload(&self) -> Self {
        RelatedMany::Unloaded
    }
}

impl<T> Clone for RelatedMany<T> {
    fn clone(&self) -> Self {
        match self {
            RelatedMany::Unloaded => RelatedMany::Unloaded,
            RelatedMany::Loaded(targets) => RelatedMany::Loaded(targets.clone()),
        }
    }
}

impl<T> Default for RelatedMany<T> {
    fn default() -> Self {
        RelatedMany::empty()
    }
}
