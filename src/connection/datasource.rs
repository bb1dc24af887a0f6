use crate::core::Result;
use async_trait::async_trait;

/// Metadata a raw connection reports about the database behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseMetadata {
    pub driver_name: String,
    pub url: String,
    pub schema_term: String,
    pub max_connections: usize,
    pub user_name: String,
}

/// A raw connection borrowed from a data source
///
/// Dropping the value releases the connection.
pub trait RawConnection: Send {
    fn metadata(&self) -> Result<DatabaseMetadata>;
}

/// Externally supplied producer of raw connections
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn connection(&self) -> Result<Box<dyn RawConnection>>;

    /// Connections currently handed out and not yet released
    fn active_connections(&self) -> usize;
}
