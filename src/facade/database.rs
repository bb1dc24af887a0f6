use crate::connection::DbConnection;
use crate::core::Result;
use crate::session::SessionFactory;
use log::{debug, error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Process-wide persistence handle
///
/// Wraps the session factory created at startup. Every unit of work gets its
/// own [`DbConnection`] from [`connection`](Self::connection); the factory
/// is torn down exactly once by [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct Database {
    shared: Arc<SharedFactory>,
}

impl Database {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            shared: Arc::new(SharedFactory {
                factory,
                shut_down: AtomicBool::new(false),
                shutdown_lock: Mutex::new(()),
            }),
        }
    }

    /// A fresh connection handle with no session yet
    pub fn connection(&self) -> DbConnection {
        DbConnection::new(Arc::clone(&self.shared))
    }

    /// Close the session factory
    ///
    /// Must only be called once no unit of work holds an open session.
    /// Concurrent callers are serialized and only the first one closes the
    /// factory. If closing fails the database is still considered shut down.
    pub async fn shutdown(&self) -> Result<()> {
        self.shared.shutdown().await
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }

    pub fn dialect(&self) -> String {
        self.shared.factory().dialect()
    }
}

pub(crate) struct SharedFactory {
    factory: Arc<dyn SessionFactory>,
    shut_down: AtomicBool,
    shutdown_lock: Mutex<()>,
}

impl SharedFactory {
    pub(crate) fn factory(&self) -> &Arc<dyn SessionFactory> {
        &self.factory
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        let _guard = self.shutdown_lock.lock().await;
        if self.is_shut_down() {
            debug!("Session factory already shut down");
            return Ok(());
        }

        let result = self.factory.close().await;
        self.shut_down.store(true, Ordering::SeqCst);

        match &result {
            Ok(()) => info!("Session factory shut down"),
            Err(e) => error!("Session factory shutdown failed: {}", e),
        }
        result
    }
}
