// ABOUTME: Criterion benchmarks for the series fold, weekly aggregation and full materialization
// ABOUTME: Measures EMA and Kalman passes over growing histories and the persisted rebuild path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Criterion benchmarks for daily series materialization.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::expect_used,
    missing_docs
)]

mod common;

use std::collections::HashSet;

use chrono::{Duration, Utc};
use common::fixtures::{base_date, generate_facts, generate_timeline, generate_versions, HistoryLength};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use healthseries::config::DatabaseUrl;
use healthseries::database::Database;
use healthseries::engine::{
    EngineConfig, FatMassEstimator, SeriesEngine, SeriesInput, WeekInput, WeeklyAggregator,
};
use healthseries::materialization::{MaterializeRequest, Materializer};
use healthseries::models::{DateRange, MaterializedDay};
use tokio::runtime::Runtime;
use uuid::Uuid;

const LENGTHS: [HistoryLength; 3] = [
    HistoryLength::Quarter,
    HistoryLength::Year,
    HistoryLength::FiveYears,
];

fn full_range(days: i64) -> DateRange {
    DateRange::new(base_date(), base_date() + Duration::days(days - 1)).unwrap()
}

fn bench_series_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_fold");
    let empty = HashSet::new();

    for estimator in [FatMassEstimator::Ema, FatMassEstimator::Kalman] {
        let mut config = EngineConfig::default();
        config.smoothing.fat_mass_estimator = estimator;

        for length in LENGTHS {
            let facts = generate_facts(length.days());
            let timeline = generate_timeline(length.days());
            let range = full_range(length.days());

            group.throughput(Throughput::Elements(length.days().unsigned_abs()));
            group.bench_with_input(
                BenchmarkId::new(estimator.to_string(), length.name()),
                &facts,
                |b, facts| {
                    let engine = SeriesEngine::new(&config, &timeline);
                    b.iter(|| {
                        engine
                            .compute(black_box(&SeriesInput {
                                range,
                                facts,
                                audited: &empty,
                                admitted: &empty,
                                classified: &HashSet::new(),
                                seed: None,
                            }))
                            .unwrap()
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_weekly_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("weekly_aggregation");
    let days = HistoryLength::FiveYears.days();
    let config = EngineConfig::default();
    let timeline = generate_timeline(days);
    let facts = generate_facts(days);
    let empty = HashSet::new();
    let output = SeriesEngine::new(&config, &timeline)
        .compute(&SeriesInput {
            range: full_range(days),
            facts: &facts,
            audited: &empty,
            admitted: &empty,
            classified: &HashSet::new(),
            seed: None,
        })
        .unwrap();

    let run_id = Uuid::new_v4();
    let rows: Vec<MaterializedDay> = output
        .days
        .iter()
        .map(|day| {
            let (bmr_kcal, compensated_exercise_kcal, net_energy_kcal) = day.metrics.rounded();
            MaterializedDay {
                date: day.date,
                fat_mass_kg: day.state.fat_mass_kg,
                lean_mass_kg: day.state.lean_mass_kg,
                fat_mass_variance: day.state.fat_mass_variance,
                bmr_kcal,
                compensated_exercise_kcal,
                net_energy_kcal,
                parameter_version_id: day.parameter_version_id.clone(),
                computed_at: Utc::now(),
                run_id,
            }
        })
        .collect();
    let weeks: Vec<WeekInput> = rows
        .chunks_exact(7)
        .map(|week| WeekInput {
            week_start: week[0].date,
            days: week.to_vec(),
            recorded_intake_kcal: vec![2100.0; 7],
        })
        .collect();

    group.throughput(Throughput::Elements(weeks.len() as u64));
    group.bench_function("aggregate_all_5y", |b| {
        let aggregator = WeeklyAggregator::new(&timeline);
        b.iter(|| aggregator.aggregate_all(black_box(&weeks), Utc::now()));
    });
    group.finish();
}

fn bench_materialize(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("materialize");
    group.sample_size(20);

    let days = HistoryLength::Year.days();
    let db = rt.block_on(async {
        let db = Database::new(&DatabaseUrl::Memory).await.unwrap();
        for version in generate_versions(days) {
            db.create_parameter_version(&version).await.unwrap();
        }
        let facts: Vec<_> = generate_facts(days).into_values().collect();
        db.upsert_daily_facts(&facts).await.unwrap();
        db
    });
    let engine = Materializer::new(db, EngineConfig::default());
    let range = full_range(days);

    group.throughput(Throughput::Elements(days.unsigned_abs()));
    group.bench_function("rebuild_365d", |b| {
        b.to_async(&rt).iter(|| async {
            engine
                .materialize(MaterializeRequest::rebuild(range.start(), range.end()))
                .await
                .unwrap()
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_series_fold,
    bench_weekly_aggregation,
    bench_materialize
);
criterion_main!(benches);
