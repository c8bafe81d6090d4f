// ABOUTME: Integration tests for the outlier audit trail and reviewer reversals
// ABOUTME: Covers range filtering, admission records and reversal error cases
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use healthseries::database::Database;
use healthseries::errors::ErrorCode;
use healthseries::materialization::MaterializeRequest;
use healthseries::models::{BodyMetric, DailyFact, OutlierRule};

mod common;
use common::*;

/// Spikes on days 5 (fat) and 15 (fat-free), materialized over days 0..=20
async fn audited_database() -> Database {
    let db = seeded_database(20).await;
    db.upsert_daily_fact(&DailyFact {
        fat_mass_kg: Some(40.0),
        ..steady_fact(5)
    })
    .await
    .unwrap();
    db.upsert_daily_fact(&DailyFact {
        fat_free_mass_kg: Some(200.0),
        ..steady_fact(15)
    })
    .await
    .unwrap();
    materializer(&db)
        .materialize(MaterializeRequest::rebuild(day(0), day(20)))
        .await
        .unwrap();
    db
}

#[tokio::test]
async fn test_audit_lists_every_exclusion_with_its_rule() {
    let db = audited_database().await;

    let audit = db.list_outlier_audit(None).await.unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].date, day(5));
    assert_eq!(audit[0].rule, OutlierRule::AdjacentDelta);
    assert_eq!(audit[1].date, day(15));
    assert_eq!(audit[1].metric, BodyMetric::FatFreeMass);
    assert_eq!(audit[1].rule, OutlierRule::PhysiologicalBound);
    assert!(!audit[1].reason.is_empty());

    let first_half = db.list_outlier_audit(Some(range(0, 10))).await.unwrap();
    assert_eq!(first_half.len(), 1);
    assert_eq!(first_half[0].date, day(5));
}

#[tokio::test]
async fn test_reverse_exclusion_records_admission() {
    let db = audited_database().await;

    let admission = db
        .reverse_exclusion(day(5), BodyMetric::FatMass, "coach", Some("confirmed reading"))
        .await
        .unwrap();
    assert_eq!(admission.reviewer, "coach");
    assert_eq!(admission.note.as_deref(), Some("confirmed reading"));

    let remaining = db.list_outlier_audit(None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].date, day(15));

    let admissions = db.list_admissions().await.unwrap();
    assert_eq!(admissions.len(), 1);
    assert_eq!(admissions[0].date, day(5));
    assert_eq!(admissions[0].metric, BodyMetric::FatMass);

    let keys = db.admission_keys(day(0), day(20)).await.unwrap();
    assert!(keys.contains(&(day(5), BodyMetric::FatMass)));
}

#[tokio::test]
async fn test_reverse_requires_entry_and_reviewer() {
    let db = audited_database().await;

    let missing = db
        .reverse_exclusion(day(6), BodyMetric::FatMass, "coach", None)
        .await
        .unwrap_err();
    assert_eq!(missing.code, ErrorCode::ResourceNotFound);

    let anonymous = db
        .reverse_exclusion(day(5), BodyMetric::FatMass, "  ", None)
        .await
        .unwrap_err();
    assert_eq!(anonymous.code, ErrorCode::InvalidInput);

    assert_eq!(db.list_outlier_audit(None).await.unwrap().len(), 2);
    assert!(db.list_admissions().await.unwrap().is_empty());
}
