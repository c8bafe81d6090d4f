// ABOUTME: Unit tests for TransactionGuard RAII wrapper
// ABOUTME: Validates auto-rollback behavior, commit semantics, and retry patterns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::sync::atomic::{AtomicU32, Ordering};

use healthseries::database::{retry_transaction, ReplaceRangeRequest, SqliteTransactionGuard};
use healthseries::errors::{AppError, ErrorCode};
use healthseries::materialization::MaterializeRequest;
use healthseries::models::MaterializedDay;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;

mod common;
use common::*;

/// Create a test `SQLite` pool with a simple table for testing
async fn create_test_pool() -> sqlx::SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test pool");

    sqlx::query(
        r"CREATE TABLE IF NOT EXISTS test_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            value INTEGER NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .expect("Failed to create test table");

    pool
}

async fn count_items(pool: &sqlx::SqlitePool) -> i64 {
    let row = sqlx::query("SELECT COUNT(*) as count FROM test_items")
        .fetch_one(pool)
        .await
        .expect("Failed to count items");
    row.get::<i64, _>("count")
}

#[tokio::test]
async fn test_transaction_guard_commit_persists_changes() {
    let pool = create_test_pool().await;

    let tx = pool.begin().await.expect("Failed to begin transaction");
    let mut guard = SqliteTransactionGuard::new(tx);
    assert!(!guard.is_committed());

    sqlx::query("INSERT INTO test_items (name, value) VALUES ('item1', 100)")
        .execute(guard.executor().expect("Guard should have executor"))
        .await
        .expect("Failed to insert");
    guard.commit().await.expect("Commit should succeed");

    assert_eq!(count_items(&pool).await, 1);
}

#[tokio::test]
async fn test_transaction_guard_drop_without_commit_rolls_back() {
    let pool = create_test_pool().await;

    {
        let tx = pool.begin().await.expect("Failed to begin transaction");
        let mut guard = SqliteTransactionGuard::new(tx);

        sqlx::query("INSERT INTO test_items (name, value) VALUES ('item2', 200)")
            .execute(guard.executor().expect("Guard should have executor"))
            .await
            .expect("Failed to insert");
    }

    assert_eq!(count_items(&pool).await, 0);
}

#[tokio::test]
async fn test_transaction_guard_explicit_rollback() {
    let pool = create_test_pool().await;

    let tx = pool.begin().await.expect("Failed to begin transaction");
    let mut guard = SqliteTransactionGuard::new(tx);
    sqlx::query("INSERT INTO test_items (name, value) VALUES ('item3', 300)")
        .execute(guard.executor().expect("Guard should have executor"))
        .await
        .expect("Failed to insert");
    guard.rollback().await.expect("Rollback should succeed");

    assert_eq!(count_items(&pool).await, 0);
}

#[tokio::test]
async fn test_retry_transaction_recovers_from_lock() {
    let attempts = AtomicU32::new(0);

    let result = retry_transaction(
        || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < 2 {
                Err(AppError::database("database is locked"))
            } else {
                Ok(attempt)
            }
        },
        3,
    )
    .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_transaction_gives_up_after_max_retries() {
    let attempts = AtomicU32::new(0);

    let result: Result<(), AppError> = retry_transaction(
        || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(AppError::database("database is busy"))
        },
        3,
    )
    .await;

    assert_eq!(result.unwrap_err().code, ErrorCode::DatabaseError);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_replace_keeps_prior_rows() {
    let db = seeded_database(9).await;
    materializer(&db)
        .materialize(MaterializeRequest::rebuild(day(0), day(9)))
        .await
        .unwrap();
    let before: Vec<_> = stored_days(&db, 0, 9).await.iter().map(values).collect();

    let mut rows: Vec<MaterializedDay> = stored_days(&db, 0, 9).await;
    rows[3].parameter_version_id = "no-such-version".to_owned();
    let err = db
        .replace_materialized_range(&ReplaceRangeRequest {
            range: range(0, 9),
            rows: &rows,
            audits: &[],
        })
        .await
        .expect_err("foreign key violation aborts the write");
    assert_eq!(err.code, ErrorCode::DatabaseError);

    let after: Vec<_> = stored_days(&db, 0, 9).await.iter().map(values).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_replace_rejects_rows_outside_range() {
    let db = seeded_database(9).await;
    materializer(&db)
        .materialize(MaterializeRequest::rebuild(day(0), day(9)))
        .await
        .unwrap();
    let rows = stored_days(&db, 0, 9).await;

    let err = db
        .replace_materialized_range(&ReplaceRangeRequest {
            range: range(0, 4),
            rows: &rows,
            audits: &[],
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(stored_days(&db, 0, 9).await.len(), 10);
}
