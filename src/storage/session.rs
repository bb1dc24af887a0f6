use super::datasource::MemoryDataSource;
use super::memory::MemoryStore;
use crate::connection::config::ConnectionConfig;
use crate::connection::datasource::DataSource;
use crate::core::{DbError, EntityKey, Result};
use crate::entity::Entity;
use crate::session::{FlushMode, Session, SessionFactory, SessionStatistics};
use crate::transaction::{Change, Transaction, TransactionId, TransactionStatus};
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Session over a [`MemoryStore`]
///
/// Keeps an identity cache of attached entities, a list of pending writes
/// and at most one transaction. Flushing moves pending writes into the
/// transaction; committing applies them to the store.
pub struct MemorySession {
    id: u64,
    store: Arc<RwLock<MemoryStore>>,
    cache: HashMap<EntityKey, Entity>,
    pending: Vec<Change>,
    transaction: Option<Transaction>,
    flush_mode: FlushMode,
    flush_count: u64,
    open: bool,
}

impl MemorySession {
    pub fn new(id: u64, store: Arc<RwLock<MemoryStore>>) -> Self {
        Self {
            id,
            store,
            cache: HashMap::new(),
            pending: Vec::new(),
            transaction: None,
            flush_mode: FlushMode::default(),
            flush_count: 0,
            open: true,
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(DbError::SessionClosed)
        }
    }

    fn transaction_mut(&mut self) -> Result<&mut Transaction> {
        self.transaction
            .as_mut()
            .ok_or_else(|| DbError::TransactionError("No transaction has been begun".into()))
    }

    async fn flush_after_write(&mut self) -> Result<()> {
        if self.flush_mode == FlushMode::Always {
            self.flush().await?;
        }
        Ok(())
    }

    /// Latest flushed change for `key` in the running transaction
    fn staged_change(&self, key: &EntityKey) -> Option<&Change> {
        self.transaction
            .as_ref()?
            .staged()
            .iter()
            .rev()
            .find(|change| change.key() == *key)
    }

    fn discard_unit_of_work(&mut self) {
        self.pending.clear();
        self.cache.clear();
    }
}

#[async_trait]
impl Session for MemorySession {
    fn id(&self) -> u64 {
        self.id
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }

        if let Some(txn) = self.transaction.as_mut() {
            if txn.status().can_rollback() {
                debug!("Session {} closing with {} still open, rolling back", self.id, txn.id());
                txn.rollback()?;
            }
        }
        self.discard_unit_of_work();
        self.open = false;
        Ok(())
    }

    async fn begin_transaction(&mut self) -> Result<TransactionId> {
        self.check_open()?;

        if let Some(txn) = self.transaction.as_mut() {
            match txn.status() {
                TransactionStatus::Active => {
                    return Err(DbError::TransactionError(format!(
                        "{} is still active; nested transactions are not supported",
                        txn.id()
                    )));
                }
                TransactionStatus::MarkedRollback => {
                    warn!("Discarding {} marked for rollback before beginning a new transaction", txn.id());
                    txn.rollback()?;
                    self.discard_unit_of_work();
                }
                _ => {}
            }
        }

        let txn = Transaction::begin();
        let id = txn.id();
        self.transaction = Some(txn);
        Ok(id)
    }

    fn transaction_status(&self) -> TransactionStatus {
        self.transaction
            .as_ref()
            .map_or(TransactionStatus::NotActive, Transaction::status)
    }

    async fn commit_transaction(&mut self) -> Result<()> {
        self.check_open()?;
        if self.flush_mode != FlushMode::Manual {
            self.flush().await?;
        }

        let txn = self
            .transaction
            .as_mut()
            .ok_or_else(|| DbError::TransactionError("No transaction has been begun".into()))?;
        let changes = txn.begin_commit()?;

        let result = self.store.write().await.apply(changes);
        txn.finish_commit(result.is_ok());
        if result.is_err() {
            // nothing reached storage, so cached instances no longer match it
            self.discard_unit_of_work();
        }
        result
    }

    async fn rollback_transaction(&mut self) -> Result<()> {
        self.check_open()?;
        self.transaction_mut()?.rollback()?;
        self.discard_unit_of_work();
        Ok(())
    }

    fn mark_rollback_only(&mut self) -> Result<()> {
        self.check_open()?;
        self.transaction_mut()?.mark_rollback_only()
    }

    async fn flush(&mut self) -> Result<()> {
        self.check_open()?;
        if self.pending.is_empty() {
            return Ok(());
        }

        let changes = std::mem::take(&mut self.pending);
        let staged = match self.transaction.as_mut() {
            Some(txn) => txn.stage(changes.iter().cloned()),
            None => Err(DbError::TransactionError(
                "Flush requires an active transaction".into(),
            )),
        };
        if let Err(e) = staged {
            self.pending = changes;
            return Err(e);
        }

        self.flush_count += 1;
        Ok(())
    }

    fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    fn set_flush_mode(&mut self, mode: FlushMode) -> Result<()> {
        self.check_open()?;
        self.flush_mode = mode;
        Ok(())
    }

    async fn persist(&mut self, entity: Entity) -> Result<()> {
        self.check_open()?;
        self.cache.insert(entity.key(), entity.clone());
        self.pending.push(Change::Save(entity));
        self.flush_after_write().await
    }

    async fn remove(&mut self, key: EntityKey) -> Result<()> {
        self.check_open()?;
        self.cache.remove(&key);
        self.pending.push(Change::Delete(key));
        self.flush_after_write().await
    }

    async fn get(&mut self, key: EntityKey) -> Result<Option<Entity>> {
        self.check_open()?;
        if let Some(cached) = self.cache.get(&key) {
            return Ok(Some(cached.clone()));
        }

        if self.flush_mode != FlushMode::Manual && !self.pending.is_empty() {
            self.flush().await?;
        }

        let loaded = match self.staged_change(&key) {
            Some(Change::Save(entity)) => Some(entity.unloaded()),
            Some(Change::Delete(_)) => None,
            None => self.store.read().await.load(&key),
        };

        if let Some(entity) = &loaded {
            self.cache.insert(key, entity.clone());
        }
        Ok(loaded)
    }

    fn contains(&self, key: &EntityKey) -> bool {
        self.open && self.cache.contains_key(key)
    }

    fn evict(&mut self, entity: &Entity) -> Result<bool> {
        self.check_open()?;
        for dependent in entity.cascaded() {
            self.cache.remove(&dependent.key());
        }
        Ok(self.cache.remove(&entity.key()).is_some())
    }

    fn statistics(&self) -> SessionStatistics {
        SessionStatistics {
            entity_count: self.cache.len(),
            pending_writes: self.pending.len(),
            flush_count: self.flush_count,
        }
    }
}

/// Session factory over a shared [`MemoryStore`]
pub struct MemorySessionFactory {
    config: ConnectionConfig,
    store: Arc<RwLock<MemoryStore>>,
    data_source: Arc<MemoryDataSource>,
    next_session_id: AtomicU64,
    closed: AtomicBool,
}

impl MemorySessionFactory {
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let data_source = Arc::new(MemoryDataSource::new(config.clone()));

        Ok(Self {
            config,
            store: Arc::new(RwLock::new(MemoryStore::new())),
            data_source,
            next_session_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    /// Shared handle to the committed records
    pub fn store(&self) -> Arc<RwLock<MemoryStore>> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl SessionFactory for MemorySessionFactory {
    async fn open_session(&self) -> Result<Box<dyn Session>> {
        if self.is_closed() {
            return Err(DbError::ShutDown);
        }

        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession::new(id, Arc::clone(&self.store))))
    }

    fn dialect(&self) -> String {
        self.config.dialect.clone()
    }

    fn data_source(&self) -> Arc<dyn DataSource> {
        self.data_source.clone()
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(DbError::StorageError("session factory already closed".into()));
        }
        self.data_source.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Bitstream, Item, MetadataValue, ObjectCore, RelatedMany};

    fn new_session() -> (MemorySession, Arc<RwLock<MemoryStore>>) {
        let store = Arc::new(RwLock::new(MemoryStore::new()));
        (MemorySession::new(1, Arc::clone(&store)), store)
    }

    fn item(name: &str) -> Entity {
        Arc::new(Item::new(name)).into()
    }

    #[tokio::test]
    async fn test_begin_twice_is_rejected() {
        let (mut session, _) = new_session();
        session.begin_transaction().await.unwrap();
        assert!(session.begin_transaction().await.is_err());
    }

    #[tokio::test]
    async fn test_persist_commit_makes_record_durable() {
        let (mut session, store) = new_session();
        session.begin_transaction().await.unwrap();

        let entity = item("Thesis");
        let key = entity.key();
        session.persist(entity).await.unwrap();
        assert!(!store.read().await.contains(&key));

        session.commit_transaction().await.unwrap();
        assert!(store.read().await.contains(&key));
        assert_eq!(session.transaction_status(), TransactionStatus::Committed);
        assert!(session.contains(&key));
    }

    #[tokio::test]
    async fn test_rollback_discards_writes_and_cache() {
        let (mut session, store) = new_session();
        session.begin_transaction().await.unwrap();

        let entity = item("Draft");
        let key = entity.key();
        session.persist(entity).await.unwrap();
        session.flush().await.unwrap();

        session.rollback_transaction().await.unwrap();
        assert_eq!(session.transaction_status(), TransactionStatus::RolledBack);
        assert_eq!(session.entity_count(), 0);
        assert!(!store.read().await.contains(&key));
    }

    #[tokio::test]
    async fn test_always_mode_flushes_each_write() {
        let (mut session, _) = new_session();
        session.begin_transaction().await.unwrap();
        session.set_flush_mode(FlushMode::Always).unwrap();

        session.persist(item("a")).await.unwrap();
        session.persist(item("b")).await.unwrap();

        let stats = session.statistics();
        assert_eq!(stats.pending_writes, 0);
        assert_eq!(stats.flush_count, 2);
    }

    #[tokio::test]
    async fn test_manual_mode_keeps_writes_pending_on_lookup() {
        let (mut session, _) = new_session();
        session.begin_transaction().await.unwrap();
        session.set_flush_mode(FlushMode::Manual).unwrap();

        session.persist(item("a")).await.unwrap();
        let missing = EntityKey::new(crate::core::EntityKind::Item, crate::core::EntityId::new());
        assert!(session.get(missing).await.unwrap().is_none());

        let stats = session.statistics();
        assert_eq!(stats.pending_writes, 1);
        assert_eq!(stats.flush_count, 0);
    }

    #[tokio::test]
    async fn test_auto_mode_flushes_before_lookup() {
        let (mut session, _) = new_session();
        session.begin_transaction().await.unwrap();

        session.persist(item("a")).await.unwrap();
        assert_eq!(session.statistics().pending_writes, 1);

        let missing = EntityKey::new(crate::core::EntityKind::Item, crate::core::EntityId::new());
        session.get(missing).await.unwrap();
        assert_eq!(session.statistics().pending_writes, 0);
        assert_eq!(session.statistics().flush_count, 1);
    }

    #[tokio::test]
    async fn test_get_reads_flushed_but_uncommitted_write() {
        let (mut session, store) = new_session();
        session.begin_transaction().await.unwrap();

        let entity = item("Staged");
        let key = entity.key();
        session.persist(entity.clone()).await.unwrap();
        session.flush().await.unwrap();
        session.evict(&entity).unwrap();

        let reloaded = session.get(key).await.unwrap().unwrap();
        assert_eq!(reloaded.key(), key);
        assert_eq!(store.read().await.load_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_without_transaction_keeps_pending() {
        let (mut session, _) = new_session();
        session.persist(item("orphan")).await.unwrap();

        assert!(session.flush().await.is_err());
        assert_eq!(session.statistics().pending_writes, 1);
    }

    #[tokio::test]
    async fn test_evict_cascades_to_metadata() {
        let (mut session, _) = new_session();
        session.begin_transaction().await.unwrap();

        let title = Arc::new(MetadataValue::new("dc.title", "Logo", 0));
        let mut core = ObjectCore::new();
        core.metadata = RelatedMany::loaded(vec![Arc::clone(&title)]);
        let bitstream: Entity = Arc::new(Bitstream {
            core,
            name: "logo.png".into(),
            size_bytes: 3,
            checksum: None,
        })
        .into();

        session.persist(bitstream.clone()).await.unwrap();
        session.persist(title.into()).await.unwrap();
        assert_eq!(session.entity_count(), 2);

        assert!(session.evict(&bitstream).unwrap());
        assert_eq!(session.entity_count(), 0);
    }

    #[tokio::test]
    async fn test_marked_rollback_is_discarded_by_next_begin() {
        let (mut session, _) = new_session();
        session.begin_transaction().await.unwrap();
        session.persist(item("doomed")).await.unwrap();
        session.mark_rollback_only().unwrap();

        session.begin_transaction().await.unwrap();
        assert_eq!(session.transaction_status(), TransactionStatus::Active);
        assert_eq!(session.entity_count(), 0);
        assert_eq!(session.statistics().pending_writes, 0);
    }

    #[tokio::test]
    async fn test_failed_commit_status() {
        let (mut session, store) = new_session();
        store.write().await.set_fail_commits(true);
        session.begin_transaction().await.unwrap();
        session.persist(item("x")).await.unwrap();

        let result = session.commit_transaction().await;
        assert!(matches!(result, Err(DbError::StorageError(_))));
        assert_eq!(session.transaction_status(), TransactionStatus::FailedCommit);
        assert_eq!(session.entity_count(), 0);
        assert_eq!(session.statistics().pending_writes, 0);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_work() {
        let (mut session, _) = new_session();
        session.begin_transaction().await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();

        assert!(!session.is_open());
        assert!(matches!(session.persist(item("late")).await, Err(DbError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_factory_close_is_reported_twice() {
        let factory = MemorySessionFactory::new(ConnectionConfig::default()).unwrap();
        factory.close().await.unwrap();
        assert!(factory.is_closed());
        assert!(factory.close().await.is_err());
        assert!(matches!(factory.open_session().await, Err(DbError::ShutDown)));
    }
}
