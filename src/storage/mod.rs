//! In-memory storage backend
//!
//! Reference implementation of the session and data source seams, used by
//! the CLI and the test suite.

pub mod datasource;
pub mod memory;
pub mod session;

pub use datasource::{MemoryDataSource, MemoryRawConnection};
pub use memory::MemoryStore;
pub use session::{MemorySession, MemorySessionFactory};
