// ============================================================================
// Database Connection
// ============================================================================
//
// `DbConnection` is the per-unit-of-work handle over a persistence session.
// It begins a transaction lazily on first use, applies the processing mode
// to every new transaction, commits or rolls back only when there is
// something to act on, and evicts materialized object graphs from the
// session's identity cache.
//
// ============================================================================

pub mod config;
pub mod datasource;
pub mod mode;

use crate::core::{DbError, EntityId, EntityKey, Result};
use crate::entity::{Entity, EntityType, ReloadableEntity};
use crate::eviction::walk_post_order;
use crate::facade::database::SharedFactory;
use crate::session::Session;
use crate::transaction::TransactionStatus;
use config::DatabaseConfig;
use datasource::DataSource;
use log::{debug, warn};
use mode::ConnectionMode;
use std::sync::Arc;

/// Database connection handle for one unit of work
///
/// Obtained from [`Database::connection`](crate::Database::connection). The
/// handle owns its session exclusively; hand it to whichever task performs
/// the work instead of sharing it.
pub struct DbConnection {
    shared: Arc<SharedFactory>,
    session: Option<Box<dyn Session>>,
    mode: ConnectionMode,
}

impl DbConnection {
    pub(crate) fn new(shared: Arc<SharedFactory>) -> Self {
        Self {
            shared,
            session: None,
            mode: ConnectionMode::default(),
        }
    }

    /// Current session with a live transaction
    ///
    /// Opens a session if there is none and begins a transaction if none is
    /// active, applying the configured processing mode to it. Never begins a
    /// second transaction while one is active.
    ///
    /// # Examples
    ///
    /// ```
    /// # use reposession::{ConnectionConfig, Database, MemorySessionFactory};
    /// # use std::sync::Arc;
    /// # #[tokio::main]
    /// # async fn main() -> reposession::Result<()> {
    /// let factory = MemorySessionFactory::new(ConnectionConfig::default())?;
    /// let db = Database::new(Arc::new(factory));
    /// let mut conn = db.connection();
    ///
    /// conn.get_session().await?;
    /// assert!(conn.is_transaction_alive());
    /// conn.commit().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_session(&mut self) -> Result<&mut dyn Session> {
        if !self.is_transaction_alive() {
            let flush_mode = self.mode.flush_mode();
            let session = self.current_session().await?;
            let txn = session.begin_transaction().await?;
            session.set_flush_mode(flush_mode)?;
            debug!(
                "Session {} began {} with flush mode {}",
                session.id(),
                txn,
                flush_mode
            );
        }
        self.session_mut()
    }

    /// True iff a session exists and its transaction is ACTIVE
    pub fn is_transaction_alive(&self) -> bool {
        self.transaction_status() == Some(TransactionStatus::Active)
    }

    /// Same predicate as [`is_transaction_alive`](Self::is_transaction_alive)
    ///
    /// A session without an active transaction is not considered alive; use
    /// [`is_session_open`](Self::is_session_open) to ask about the session
    /// alone.
    pub fn is_session_alive(&self) -> bool {
        self.is_transaction_alive()
    }

    /// True iff a session exists and has not been closed
    pub fn is_session_open(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.is_open())
    }

    /// Status of the current session's transaction, `None` without an open session
    pub fn transaction_status(&self) -> Option<TransactionStatus> {
        self.session
            .as_ref()
            .filter(|session| session.is_open())
            .map(|session| session.transaction_status())
    }

    /// Roll back the active transaction, if any
    pub async fn rollback(&mut self) -> Result<()> {
        if self.is_transaction_alive() {
            let session = self.session_mut()?;
            session.rollback_transaction().await?;
            debug!("Session {} rolled back", session.id());
        }
        Ok(())
    }

    /// Close the session, if one is open
    ///
    /// Releases every cached entity and any transactional resources. Calling
    /// it again is a no-op.
    pub async fn close_db_connection(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            if session.is_open() {
                session.close().await?;
                debug!("Session {} closed", session.id());
            }
        }
        Ok(())
    }

    /// Flush and commit the active transaction
    ///
    /// Does nothing when no transaction is active or when it is marked for
    /// (or already in) rollback.
    pub async fn commit(&mut self) -> Result<()> {
        let committable = self
            .transaction_status()
            .is_some_and(|status| status.is_active());

        if committable {
            let session = self.session_mut()?;
            session.flush().await?;
            session.commit_transaction().await?;
            debug!("Session {} committed", session.id());
        }
        Ok(())
    }

    /// Close this handle's session and tear down the shared session factory
    ///
    /// Only the first call across all handles does the work; later calls
    /// return `Ok(())`.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.close_db_connection().await?;
        self.shared.shutdown().await
    }

    /// Dialect or storage engine identifier
    pub fn get_type(&self) -> String {
        self.shared.factory().dialect()
    }

    pub fn get_data_source(&self) -> Arc<dyn DataSource> {
        self.shared.factory().data_source()
    }

    /// Read driver and connection details from a freshly acquired raw
    /// connection, released before returning
    pub async fn get_database_config(&self) -> Result<DatabaseConfig> {
        let data_source = self.get_data_source();
        let metadata = {
            let connection = data_source.connection().await?;
            connection.metadata()?
        };

        Ok(DatabaseConfig {
            database_driver: metadata.driver_name,
            database_url: metadata.url,
            schema: metadata.schema_term,
            max_connections: metadata.max_connections,
            user_name: metadata.user_name,
        })
    }

    /// Number of entities tracked by the session's identity cache
    pub async fn get_cache_size(&mut self) -> Result<usize> {
        Ok(self.get_session().await?.entity_count())
    }

    /// Re-attach an entity to the current session
    ///
    /// Returns the entity itself when the session still tracks it, otherwise
    /// a fresh load by identifier (`None` if it no longer exists).
    pub async fn reload_entity<E: EntityType>(
        &mut self,
        entity: Option<Arc<E>>,
    ) -> Result<Option<Arc<E>>> {
        let Some(entity) = entity else {
            return Ok(None);
        };

        let key = entity.key();
        let session = self.get_session().await?;
        if session.contains(&key) {
            return Ok(Some(entity));
        }

        Ok(session.get(key).await?.and_then(E::from_entity))
    }

    /// Look up an entity by identifier through the session, loading it from
    /// storage when it is not cached
    pub async fn find<E: EntityType>(&mut self, id: EntityId) -> Result<Option<Arc<E>>> {
        let session = self.get_session().await?;
        Ok(session
            .get(EntityKey::new(E::KIND, id))
            .await?
            .and_then(E::from_entity))
    }

    /// Record the processing mode and apply it to the current session
    ///
    /// Batch processing flushes on every operation, read-only processing
    /// flushes only on request, and the default flushes automatically.
    pub async fn set_connection_mode(
        &mut self,
        batch_optimized: bool,
        read_only_optimized: bool,
    ) -> Result<()> {
        self.mode = ConnectionMode::new(batch_optimized, read_only_optimized);
        let flush_mode = self.mode.flush_mode();
        self.get_session().await?.set_flush_mode(flush_mode)
    }

    /// True when the batch processing mode was requested
    pub fn is_optimized_for_batch_processing(&self) -> bool {
        self.mode.batch_optimized
    }

    /// Processing mode applied to every new transaction
    pub fn connection_mode(&self) -> ConnectionMode {
        self.mode
    }

    /// Evict an entity and its materialized relations from the identity cache
    ///
    /// Needed when batch processing many objects in one transaction. Only
    /// relations that are already loaded are followed; nothing is loaded to
    /// be evicted. Children go before their parent and every entity is
    /// visited once, so shared and cyclic references are safe. Stored data
    /// is untouched.
    pub async fn uncache_entity<E: Into<Entity>>(&mut self, entity: Option<E>) -> Result<()> {
        let Some(entity) = entity else {
            return Ok(());
        };
        let root: Entity = entity.into();
        let root_key = root.key();

        let session = self.get_session().await?;
        let evicted = walk_post_order(root, |node| session.evict(node).map(|_| ()))?;

        debug!("Uncached {} entities reachable from {}", evicted, root_key);
        Ok(())
    }

    async fn current_session(&mut self) -> Result<&mut dyn Session> {
        if self.shared.is_shut_down() {
            return Err(DbError::ShutDown);
        }

        let needs_open = self
            .session
            .as_ref()
            .is_none_or(|session| !session.is_open());
        if needs_open {
            let session = self.shared.factory().open_session().await?;
            debug!("Opened session {}", session.id());
            self.session = Some(session);
        }

        self.session_mut()
    }

    fn session_mut(&mut self) -> Result<&mut dyn Session> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(DbError::SessionClosed),
        }
    }
}

impl Drop for DbConnection {
    fn drop(&mut self) {
        if self.is_transaction_alive() {
            warn!(
                "DbConnection dropped with an active transaction; uncommitted work is discarded. \
                 Call commit() or rollback() before dropping."
            );
        }
    }
}
