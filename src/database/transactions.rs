// ABOUTME: Transaction management with RAII guards and retry for SQLite write contention
// ABOUTME: Provides automatic rollback on drop and exponential backoff on locked databases
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Transaction management with RAII guards and retry patterns
//!
//! - `TransactionGuard`: wrapper that rolls back unless `commit()` is reached
//! - `retry_transaction`: exponential backoff for `database is locked` / busy errors
//!
//! Every strip-and-replace write goes through both:
//!
//! ```text
//! retry_transaction(|| async {
//!     let mut guard = TransactionGuard::new(pool.begin().await?);
//!     sqlx::query("DELETE FROM materialized_days ...").execute(guard.executor()?).await?;
//!     sqlx::query("INSERT INTO materialized_days ...").execute(guard.executor()?).await?;
//!     guard.commit().await
//! }, 3).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use sqlx::{Database, Transaction};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::errors::{AppError, AppResult, ErrorCode};

/// Retry a transaction operation if it fails due to `SQLite` lock contention
///
/// Only `DatabaseError`s whose message names a lock, busy or timeout condition
/// are retried; domain errors and constraint violations propagate immediately.
///
/// # Exponential Backoff
/// - Attempt 1: 20ms
/// - Attempt 2: 40ms
/// - Attempt 3: 80ms
///
/// # Errors
///
/// Returns the last error once `max_retries` attempts have failed, or the first
/// non-retryable error
pub async fn retry_transaction<F, Fut, T>(mut f: F, max_retries: u32) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempts: u32 = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempts += 1;
                if attempts >= max_retries {
                    error!(
                        attempts,
                        max_retries,
                        error = %e,
                        "Transaction failed after max retries"
                    );
                    return Err(e);
                }

                if is_retryable_error(&e) {
                    let backoff_ms = 10_u64 << attempts.min(10);
                    warn!(
                        attempt = attempts,
                        max_retries,
                        backoff_ms,
                        error = %e,
                        "Transaction failed with retryable error, retrying after backoff"
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                } else {
                    debug!(attempts, error = %e, "Transaction failed with non-retryable error");
                    return Err(e);
                }
            }
        }
    }
}

/// Check if a database error is transient
pub(crate) fn is_retryable_error(error: &AppError) -> bool {
    if error.code != ErrorCode::DatabaseError {
        return false;
    }
    let message = error.message.to_lowercase();

    if message.contains("constraint") {
        return false;
    }

    message.contains("database is locked")
        || message.contains("locked")
        || message.contains("busy")
        || message.contains("timeout")
        || message.contains("timed out")
}

/// RAII guard for database transactions ensuring automatic rollback on drop
///
/// If the guard is dropped before `commit()` (an early `?` return or a cancelled
/// future), `SQLx` rolls the transaction back and the store keeps its prior state.
pub struct TransactionGuard<'c, DB: Database> {
    transaction: Option<Transaction<'c, DB>>,
    committed: bool,
}

impl<'c, DB: Database> TransactionGuard<'c, DB> {
    /// Create a new transaction guard from an existing `SQLx` transaction
    #[must_use]
    pub fn new(transaction: Transaction<'c, DB>) -> Self {
        debug!("TransactionGuard created - transaction will auto-rollback if not committed");
        Self {
            transaction: Some(transaction),
            committed: false,
        }
    }

    /// Commit the transaction and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction was already consumed or the commit fails
    pub async fn commit(mut self) -> AppResult<()> {
        match self.transaction.take() {
            Some(tx) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::database(format!("Transaction commit failed: {e}")))?;
                self.committed = true;
                debug!("TransactionGuard committed successfully");
                Ok(())
            }
            None => Err(AppError::internal(
                "Transaction already consumed - cannot commit",
            )),
        }
    }

    /// Explicitly rollback the transaction and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback operation fails
    pub async fn rollback(mut self) -> AppResult<()> {
        match self.transaction.take() {
            Some(tx) => {
                tx.rollback()
                    .await
                    .map_err(|e| AppError::database(format!("Transaction rollback failed: {e}")))?;
                debug!("TransactionGuard rolled back explicitly");
                Ok(())
            }
            None => Err(AppError::internal(
                "Transaction already consumed - cannot rollback",
            )),
        }
    }

    /// Check if the transaction has been committed
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.committed
    }

    /// Get a mutable reference to the underlying connection for executing queries
    ///
    /// # Errors
    ///
    /// Returns an error if the guard is used after commit or rollback
    pub fn executor(&mut self) -> AppResult<&mut <DB as Database>::Connection> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::internal("Transaction already consumed - guard used after commit/rollback")
        })
    }
}

impl<DB: Database> Drop for TransactionGuard<'_, DB> {
    fn drop(&mut self) {
        if self.transaction.is_some() && !self.committed {
            warn!(
                "TransactionGuard dropped without commit - transaction will be rolled back automatically"
            );
        }
    }
}

/// Type alias for `SQLite` transaction guard
pub type SqliteTransactionGuard<'c> = TransactionGuard<'c, sqlx::Sqlite>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable_error(&AppError::database(
            "Failed to replace range: database is locked"
        )));
        assert!(is_retryable_error(&AppError::database("SQLITE_BUSY")));
        assert!(!is_retryable_error(&AppError::database(
            "UNIQUE constraint failed: parameter_versions.version_id"
        )));
        assert!(!is_retryable_error(&AppError::invalid_input("locked")));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_locked_database() {
        let calls = AtomicU32::new(0);
        let result = retry_transaction(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AppError::database("database is locked"))
                } else {
                    Ok(7)
                }
            },
            3,
        )
        .await;
        assert!(matches!(result, Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_stops_on_domain_error() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_transaction(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::not_found("Parameter version v9"))
            },
            3,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
