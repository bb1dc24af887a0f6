// ============================================================================
// Transaction State Management
// ============================================================================
//
// Lifecycle of a single session transaction:
//
//   NotActive ──begin──> Active ──commit──> Committing ──> Committed
//                          │                    └────────> FailedCommit
//                          ├──mark_rollback_only──> MarkedRollback
//                          └──rollback──> RolledBack
//
// `RollingBack` is only reported by backends whose rollback is still in
// flight; the in-memory transaction rolls back in one step. A marked
// transaction can still be rolled back. Terminal states need a new
// transaction before any further work.
//
// ============================================================================

use super::Change;
use crate::core::{DbError, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Global transaction ID counter
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    NotActive,
    Active,
    MarkedRollback,
    Committing,
    Committed,
    RollingBack,
    RolledBack,
    FailedCommit,
}

impl TransactionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionStatus::Active)
    }

    pub fn is_one_of(&self, statuses: &[TransactionStatus]) -> bool {
        statuses.contains(self)
    }

    /// Check if transaction is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed
                | TransactionStatus::RolledBack
                | TransactionStatus::FailedCommit
        )
    }

    pub fn can_rollback(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Active | TransactionStatus::MarkedRollback
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionStatus::NotActive => "NOT_ACTIVE",
            TransactionStatus::Active => "ACTIVE",
            TransactionStatus::MarkedRollback => "MARKED_ROLLBACK",
            TransactionStatus::Committing => "COMMITTING",
            TransactionStatus::Committed => "COMMITTED",
            TransactionStatus::RollingBack => "ROLLING_BACK",
            TransactionStatus::RolledBack => "ROLLED_BACK",
            TransactionStatus::FailedCommit => "FAILED_COMMIT",
        };
        f.write_str(name)
    }
}

/// A session transaction and the changes flushed into it
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    status: TransactionStatus,
    /// Flushed changes waiting for commit
    staged: Vec<Change>,
    started_at: DateTime<Utc>,
    /// Start time for diagnostics
    start_time: Instant,
}

impl Transaction {
    /// Begin a new active transaction
    pub fn begin() -> Self {
        Self {
            id: TransactionId::new(),
            status: TransactionStatus::Active,
            staged: Vec::new(),
            started_at: Utc::now(),
            start_time: Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn staged(&self) -> &[Change] {
        &self.staged
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Move flushed changes into the transaction
    ///
    /// # Errors
    /// Returns error if transaction is not active
    pub fn stage(&mut self, changes: impl IntoIterator<Item = Change>) -> Result<()> {
        if !self.status.is_active() {
            return Err(DbError::TransactionError(format!(
                "Cannot flush: transaction {} is {}",
                self.id, self.status
            )));
        }

        self.staged.extend(changes);
        Ok(())
    }

    pub fn mark_rollback_only(&mut self) -> Result<()> {
        if !self.status.is_active() {
            return Err(DbError::TransactionError(format!(
                "Cannot mark for rollback: transaction {} is {}",
                self.id, self.status
            )));
        }

        self.status = TransactionStatus::MarkedRollback;
        Ok(())
    }

    /// Enter `Committing` and hand out the staged changes to apply
    ///
    /// # Errors
    /// Returns error if transaction is not active
    pub fn begin_commit(&mut self) -> Result<Vec<Change>> {
        if !self.status.is_active() {
            return Err(DbError::TransactionError(format!(
                "Cannot commit: transaction {} is {}",
                self.id, self.status
            )));
        }

        self.status = TransactionStatus::Committing;
        Ok(std::mem::take(&mut self.staged))
    }

    pub fn finish_commit(&mut self, applied: bool) {
        self.status = if applied {
            TransactionStatus::Committed
        } else {
            TransactionStatus::FailedCommit
        };
    }

    /// Discard staged changes and mark the transaction rolled back
    ///
    /// # Errors
    /// Returns error if transaction is neither active nor marked for rollback
    pub fn rollback(&mut self) -> Result<()> {
        if !self.status.can_rollback() {
            return Err(DbError::TransactionError(format!(
                "Cannot rollback: transaction {} is already {}",
                self.id, self.status
            )));
        }

        self.staged.clear();
        self.status = TransactionStatus::RolledBack;
        Ok(())
    }
}
