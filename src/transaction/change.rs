// ============================================================================
// Pending Writes
// ============================================================================
//
// A write recorded by a session. Pending changes live in the session until a
// flush stages them in the transaction; staged changes reach storage on
// commit and are discarded on rollback.
//
// ============================================================================

use crate::core::EntityKey;
use crate::entity::Entity;

#[derive(Debug, Clone)]
pub enum Change {
    /// Insert or overwrite the stored record for the entity
    Save(Entity),

    /// Remove the stored record
    Delete(EntityKey),
}

impl Change {
    pub fn key(&self) -> EntityKey {
        match self {
            Change::Save(entity) => entity.key(),
            Change::Delete(key) => *key,
        }
    }
}
