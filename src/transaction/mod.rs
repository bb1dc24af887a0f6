// ============================================================================
// Transaction Management Module
// ============================================================================
//
// Per-session transaction state and the change log a flush produces.
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::Change;
pub use state::{Transaction, TransactionId, TransactionStatus};
