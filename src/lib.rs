// ============================================================================
// reposession Library
// ============================================================================
//
// Transactional persistence sessions for a digital repository object model.
//
// A `Database` wraps the process-wide session factory. Each unit of work
// takes a `DbConnection` from it, which begins transactions lazily, applies
// the processing mode as a flush mode, and can evict materialized object
// graphs from the identity cache during long batch runs.
//
// ============================================================================

pub mod connection;
pub mod core;
pub mod entity;
pub mod eviction;
pub mod facade;
pub mod session;
pub mod storage;
pub mod transaction;

pub use connection::{
    DbConnection,
    config::{ConnectionConfig, DatabaseConfig},
    datasource::{DataSource, DatabaseMetadata, RawConnection},
    mode::ConnectionMode,
};
pub use core::{DbError, EntityId, EntityKey, EntityKind, Result};
pub use entity::{
    Action, Bitstream, Bundle, Collection, Community, EPerson, Entity, EntityType, Group, Handle,
    Item, MetadataValue, ObjectCore, Related, RelatedMany, ReloadableEntity, ResourcePolicy,
};
pub use eviction::{GraphNode, walk_post_order};
pub use facade::Database;
pub use session::{FlushMode, Session, SessionFactory, SessionStatistics};
pub use storage::{MemoryDataSource, MemorySession, MemorySessionFactory, MemoryStore};
pub use transaction::{TransactionId, TransactionStatus};
