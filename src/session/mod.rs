// ============================================================================
// Session Contracts
// ============================================================================
//
// Capabilities the connection wrapper needs from a persistence backend. The
// wrapper never creates storage sessions itself; it asks a `SessionFactory`
// for one and orchestrates its transaction, flush policy and identity cache.
//
// ============================================================================

use crate::connection::datasource::DataSource;
use crate::core::{EntityKey, Result};
use crate::entity::Entity;
use crate::transaction::{TransactionId, TransactionStatus};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// When pending writes are pushed to the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Flush before lookups that could observe pending writes
    #[default]
    Auto,
    /// Flush after every write and before every lookup
    Always,
    /// Flush only when explicitly requested
    Manual,
}

impl fmt::Display for FlushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushMode::Auto => write!(f, "AUTO"),
            FlushMode::Always => write!(f, "ALWAYS"),
            FlushMode::Manual => write!(f, "MANUAL"),
        }
    }
}

/// Point-in-time counters for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStatistics {
    /// Entities tracked by the identity cache
    pub entity_count: usize,
    /// Writes recorded but not yet flushed
    pub pending_writes: usize,
    /// Flushes performed over the session's lifetime
    pub flush_count: u64,
}

/// A unit-of-work scoped persistence context
///
/// Owned by exactly one unit of work at a time; it is never shared between
/// concurrent callers.
#[async_trait]
pub trait Session: Send + Sync {
    fn id(&self) -> u64;

    fn is_open(&self) -> bool;

    /// Close the session, rolling back an unfinished transaction and
    /// discarding the identity cache. Closing twice is allowed.
    async fn close(&mut self) -> Result<()>;

    async fn begin_transaction(&mut self) -> Result<TransactionId>;

    /// `NotActive` when no transaction was ever begun
    fn transaction_status(&self) -> TransactionStatus;

    async fn commit_transaction(&mut self) -> Result<()>;

    async fn rollback_transaction(&mut self) -> Result<()>;

    fn mark_rollback_only(&mut self) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;

    fn flush_mode(&self) -> FlushMode;

    fn set_flush_mode(&mut self, mode: FlushMode) -> Result<()>;

    /// Attach the entity to the identity cache and record a save
    async fn persist(&mut self, entity: Entity) -> Result<()>;

    /// Detach the entity and record a delete
    async fn remove(&mut self, key: EntityKey) -> Result<()>;

    /// Cached instance if attached, otherwise a fresh load from storage
    async fn get(&mut self, key: EntityKey) -> Result<Option<Entity>>;

    fn contains(&self, key: &EntityKey) -> bool;

    /// Drop one entity (and its cascade-all dependents) from the identity
    /// cache. Stored data and pending writes are left alone.
    fn evict(&mut self, entity: &Entity) -> Result<bool>;

    fn statistics(&self) -> SessionStatistics;

    fn entity_count(&self) -> usize {
        self.statistics().entity_count
    }
}

/// Process-wide source of sessions, created once at startup
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn Session>>;

    /// Identifier of the SQL dialect or storage engine
    fn dialect(&self) -> String;

    fn data_source(&self) -> Arc<dyn DataSource>;

    /// Release every resource held by the factory
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}
