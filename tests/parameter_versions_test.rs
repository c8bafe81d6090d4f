// ABOUTME: Integration tests for effective-dated parameter version management
// ABOUTME: Covers creation, supersession, validation and the delete guard for referenced versions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use healthseries::errors::ErrorCode;
use healthseries::materialization::MaterializeRequest;

mod common;
use common::*;

#[tokio::test]
async fn test_create_and_list_in_start_order() {
    let db = create_test_database().await;
    db.create_parameter_version(&version("v2", 30, None))
        .await
        .unwrap();
    db.create_parameter_version(&version("v1", 0, Some(29)))
        .await
        .unwrap();

    let versions = db.list_parameter_versions().await.unwrap();
    let ids: Vec<_> = versions.iter().map(|v| v.version_id.as_str()).collect();
    assert_eq!(ids, ["v1", "v2"]);
    assert_eq!(versions[0].effective_end_date, Some(day(29)));

    let fetched = db.get_parameter_version("v2").await.unwrap().unwrap();
    assert_eq!(fetched, version("v2", 30, None));
    assert!(db.get_parameter_version("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_id_and_start_date_are_rejected() {
    let db = create_test_database().await;
    db.create_parameter_version(&version("v1", 0, None))
        .await
        .unwrap();

    let same_id = db
        .create_parameter_version(&version("v1", 10, None))
        .await
        .expect_err("duplicate id");
    assert_eq!(same_id.code, ErrorCode::ResourceAlreadyExists);

    let same_start = db
        .create_parameter_version(&version("v9", 0, None))
        .await
        .expect_err("duplicate start date");
    assert_eq!(same_start.code, ErrorCode::ResourceAlreadyExists);
    assert_eq!(db.list_parameter_versions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_coefficients_are_rejected() {
    let db = create_test_database().await;
    let mut bad_alpha = version("v1", 0, None);
    bad_alpha.alpha_fat_mass = 1.5;
    let err = db.create_parameter_version(&bad_alpha).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert!(err.message.contains("alpha_fat_mass"));

    let mut bad_compensation = version("v1", 0, None);
    bad_compensation.exercise_compensation_fraction = 1.0;
    let err = db
        .create_parameter_version(&bad_compensation)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let inverted = version("v1", 10, Some(5));
    let err = db.create_parameter_version(&inverted).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert!(db.list_parameter_versions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_supersede_closes_prior_the_day_before() {
    let db = create_test_database().await;
    db.create_parameter_version(&version("v1", 0, None))
        .await
        .unwrap();
    db.supersede_parameter_version("v1", &version("v2", 14, None))
        .await
        .unwrap();

    let prior = db.get_parameter_version("v1").await.unwrap().unwrap();
    assert_eq!(prior.effective_end_date, Some(day(13)));
    let next = db.get_parameter_version("v2").await.unwrap().unwrap();
    assert_eq!(next.effective_start_date, day(14));
    assert_eq!(next.effective_end_date, None);
}

#[tokio::test]
async fn test_supersede_requires_later_start_and_known_prior() {
    let db = create_test_database().await;
    db.create_parameter_version(&version("v1", 10, None))
        .await
        .unwrap();

    let earlier = db
        .supersede_parameter_version("v1", &version("v2", 10, None))
        .await
        .expect_err("same start");
    assert_eq!(earlier.code, ErrorCode::InvalidInput);

    let unknown = db
        .supersede_parameter_version("nope", &version("v2", 20, None))
        .await
        .expect_err("unknown prior");
    assert_eq!(unknown.code, ErrorCode::ResourceNotFound);

    let prior = db.get_parameter_version("v1").await.unwrap().unwrap();
    assert_eq!(prior.effective_end_date, None);
    assert!(db.get_parameter_version("v2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_referenced_version_cannot_be_deleted() {
    let db = seeded_database(6).await;
    db.create_parameter_version(&version("unused", 100, None))
        .await
        .unwrap();
    materializer(&db)
        .materialize(MaterializeRequest::rebuild(day(0), day(6)))
        .await
        .unwrap();

    let err = db.delete_parameter_version("v1").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceLocked);
    assert_eq!(db.count_rows_for_version("v1").await.unwrap(), 7);

    db.delete_parameter_version("unused").await.unwrap();
    let err = db.delete_parameter_version("unused").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}
