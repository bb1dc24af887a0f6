use crate::connection::config::ConnectionConfig;
use crate::connection::datasource::{DataSource, DatabaseMetadata, RawConnection};
use crate::core::{DbError, Result};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Data source handing out connections to the in-memory store
///
/// Enforces `max_connections` and tracks how many connections are
/// outstanding so callers can verify they are released.
pub struct MemoryDataSource {
    config: ConnectionConfig,
    /// Connections handed out and not yet dropped
    active: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl MemoryDataSource {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            active: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn metadata(&self) -> DatabaseMetadata {
        DatabaseMetadata {
            driver_name: self.config.driver_name.clone(),
            url: self.config.to_url(),
            schema_term: self.config.schema_term.clone(),
            max_connections: self.config.max_connections,
            user_name: self.config.username.clone(),
        }
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn connection(&self) -> Result<Box<dyn RawConnection>> {
        if self.is_closed() {
            return Err(DbError::ShutDown);
        }

        let max = self.config.max_connections;
        let acquired = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < max).then_some(current + 1)
            });
        if acquired.is_err() {
            return Err(DbError::StorageError(format!(
                "Connection limit reached ({max} connections in use)"
            )));
        }

        debug!("Raw connection acquired ({}/{max} in use)", self.active.load(Ordering::SeqCst));
        Ok(Box::new(MemoryRawConnection {
            metadata: self.metadata(),
            active: Arc::clone(&self.active),
        }))
    }

    fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// A raw connection; returns its slot to the data source when dropped
pub struct MemoryRawConnection {
    metadata: DatabaseMetadata,
    active: Arc<AtomicUsize>,
}

impl RawConnection for MemoryRawConnection {
    fn metadata(&self) -> Result<DatabaseMetadata> {
        Ok(self.metadata.clone())
    }
}

impl Drop for MemoryRawConnection {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
