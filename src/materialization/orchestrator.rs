// ABOUTME: Drives a materialization run from range resolution to the strip-and-replace commit
// ABOUTME: Records every run with its outcome and runs disjoint ranges concurrently
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use futures_util::future::join_all;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::planner::{plan_range, validate_seed, MaterializeRequest, RangePlan, StoreBounds};
use super::range_lock::RangeLockRegistry;
use crate::constants::materialization::PERSIST_MAX_RETRIES;
use crate::database::{retry_transaction, Database, ReplaceRangeRequest};
use crate::engine::{
    EngineConfig, ParameterTimeline, ReadingKey, SeriesEngine, SeriesInput, SeriesOutput,
};
use crate::errors::{AppError, AppResult, MaterializationError};
use crate::models::{
    DailyFact, DateRange, MaterializationOutcome, MaterializationRun, MaterializedDay,
    OutlierAudit, RunState, SeedState,
};

/// Inputs for one range, loaded once before the sequential pass
struct LoadedInputs {
    timeline: ParameterTimeline,
    facts: BTreeMap<NaiveDate, DailyFact>,
    audited: HashSet<ReadingKey>,
    admitted: HashSet<ReadingKey>,
    classified: HashSet<NaiveDate>,
    seed: Option<SeedState>,
}

/// Materialization orchestrator
///
/// Cloning is cheap; clones share the pool and the range lock registry.
#[derive(Clone)]
pub struct Materializer {
    database: Database,
    config: Arc<EngineConfig>,
    locks: Arc<RangeLockRegistry>,
}

impl Materializer {
    /// Create an orchestrator with its own lock registry
    #[must_use]
    pub fn new(database: Database, config: EngineConfig) -> Self {
        Self::with_lock_registry(database, config, Arc::new(RangeLockRegistry::new()))
    }

    /// Create an orchestrator sharing an existing lock registry
    #[must_use]
    pub fn with_lock_registry(
        database: Database,
        config: EngineConfig,
        locks: Arc<RangeLockRegistry>,
    ) -> Self {
        Self {
            database,
            config: Arc::new(config),
            locks,
        }
    }

    /// Lock registry shared by this orchestrator's runs
    #[must_use]
    pub const fn lock_registry(&self) -> &Arc<RangeLockRegistry> {
        &self.locks
    }

    /// Engine configuration applied to every run
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one materialization
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed range
    /// - `RangeLocked` if another run holds an overlapping range
    /// - `ParameterCoverageMissing` / `SeedUnavailable` when the pass cannot run;
    ///   the run is recorded as failed and nothing is written
    /// - database errors from loading or persisting
    pub async fn materialize(&self, request: MaterializeRequest) -> AppResult<MaterializationOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("materialize", %run_id, mode = request.mode().as_str());
        self.run(run_id, request).instrument(span).await
    }

    /// Rebuild several disjoint ranges, each as its own run
    ///
    /// Each range is seeded from the materialized day before its own start. A range
    /// starting the day after another one ends reads that range's last day, so such
    /// chains run in date order; independent chains run concurrently. Once a link
    /// fails, later links of its chain are not attempted.
    ///
    /// # Errors
    ///
    /// `InvalidRange` if any two ranges overlap; per-range results are returned in
    /// request order
    pub async fn materialize_disjoint(
        &self,
        ranges: &[DateRange],
    ) -> AppResult<Vec<AppResult<MaterializationOutcome>>> {
        for (index, range) in ranges.iter().enumerate() {
            if let Some(other) = ranges[index + 1..].iter().find(|other| other.overlaps(range)) {
                return Err(MaterializationError::InvalidRange(format!(
                    "ranges {range} and {other} overlap"
                ))
                .into());
            }
        }

        let mut order: Vec<usize> = (0..ranges.len()).collect();
        order.sort_by_key(|&index| ranges[index].start());
        let mut chains: Vec<Vec<usize>> = Vec::new();
        for index in order {
            match chains.last_mut() {
                Some(chain)
                    if chain
                        .last()
                        .is_some_and(|&prev| ranges[prev].is_followed_by(&ranges[index])) =>
                {
                    chain.push(index);
                }
                _ => chains.push(vec![index]),
            }
        }

        info!(
            ranges = ranges.len(),
            chains = chains.len(),
            "Materializing disjoint ranges"
        );
        let chain_results = join_all(chains.iter().map(|chain| self.run_chain(ranges, chain))).await;

        let mut results: Vec<Option<AppResult<MaterializationOutcome>>> =
            ranges.iter().map(|_| None).collect();
        for (index, result) in chain_results.into_iter().flatten() {
            results[index] = Some(result);
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// Run adjacent ranges one after another
    async fn run_chain(
        &self,
        ranges: &[DateRange],
        chain: &[usize],
    ) -> Vec<(usize, AppResult<MaterializationOutcome>)> {
        let mut results = Vec::with_capacity(chain.len());
        let mut failed: Option<DateRange> = None;
        for &index in chain {
            let range = ranges[index];
            let result = match failed {
                Some(previous) => Err(MaterializationError::InvalidRange(format!(
                    "range {range} skipped: the range {previous} it continues failed"
                ))
                .into()),
                None => {
                    self.materialize(MaterializeRequest::rebuild(range.start(), range.end()))
                        .await
                }
            };
            if result.is_err() && failed.is_none() {
                failed = Some(range);
            }
            results.push((index, result));
        }
        results
    }

    async fn load_bounds(&self) -> AppResult<StoreBounds> {
        Ok(StoreBounds {
            latest_materialized: self.database.latest_materialized_date().await?,
            latest_fact: self.database.latest_fact_date().await?,
            earliest_complete: self.database.earliest_complete_body_composition_date().await?,
        })
    }

    /// Mark runs that are non-terminal but hold no range lock as failed
    async fn close_abandoned_runs(&self) -> AppResult<()> {
        let locks = Arc::clone(&self.locks);
        let abandoned = self
            .database
            .fail_abandoned_runs(move |run_id| locks.holds(run_id))
            .await?;
        for run_id in abandoned {
            warn!(abandoned_run = %run_id, "Closed run left unfinished");
        }
        Ok(())
    }

    async fn run(&self, run_id: Uuid, request: MaterializeRequest) -> AppResult<MaterializationOutcome> {
        if let Some(seed) = &request.seed {
            validate_seed(seed, &self.config.outliers)?;
        }
        self.close_abandoned_runs().await?;

        let mut state = RunState::Pending.transition(RunState::ResolvingRange)?;
        let plan = plan_range(&request, &self.load_bounds().await?)?;

        let mut run = MaterializationRun {
            run_id,
            mode: request.mode(),
            requested_start: request.start,
            requested_end: request.end,
            start_date: None,
            end_date: None,
            state,
            rows_processed: 0,
            outliers_flagged: 0,
            started_at: Utc::now(),
            completed_at: None,
            error_code: None,
            error_detail: None,
            engine_config: self.config.to_json(),
        };

        let RangePlan::Compute(range) = plan else {
            return self.record_up_to_date(run).await;
        };

        let _lock = self.locks.try_acquire(run_id, range)?;
        state = state.transition(RunState::Computing)?;
        run.state = state;
        run.start_date = Some(range.start());
        run.end_date = Some(range.end());
        self.database.insert_run(&run).await?;
        info!(start = %range.start(), end = %range.end(), "Materialization started");

        match self.compute_and_persist(run_id, range, request.seed, &mut state).await {
            Ok((rows, outliers)) => {
                state.transition(RunState::Completed)?;
                self.database
                    .record_run_completion(run_id, rows, outliers)
                    .await?;
                info!(rows, outliers, "Materialization completed");
                Ok(MaterializationOutcome {
                    run_id,
                    rows_processed: rows,
                    outliers_flagged: outliers,
                    start_date: Some(range.start()),
                    end_date: Some(range.end()),
                })
            }
            Err(e) => {
                state.transition(RunState::Failed)?;
                error!(code = %e.code, error = %e, "Materialization failed");
                if let Err(record_error) = self.database.record_run_failure(run_id, &e).await {
                    warn!(error = %record_error, "Could not record run failure");
                }
                Err(e)
            }
        }
    }

    /// Log an extend-forward that found nothing new as a completed empty run
    async fn record_up_to_date(&self, mut run: MaterializationRun) -> AppResult<MaterializationOutcome> {
        let state = run
            .state
            .transition(RunState::Computing)?
            .transition(RunState::Persisting)?
            .transition(RunState::Completed)?;
        run.state = state;
        run.completed_at = Some(Utc::now());
        self.database.insert_run(&run).await?;
        info!("Materialized series already up to date");
        Ok(MaterializationOutcome {
            run_id: run.run_id,
            rows_processed: 0,
            outliers_flagged: 0,
            start_date: None,
            end_date: None,
        })
    }

    async fn load_inputs(&self, range: DateRange, seed: Option<SeedState>) -> AppResult<LoadedInputs> {
        let timeline = ParameterTimeline::new(self.database.list_parameter_versions().await?);

        let lookback_start = range
            .start()
            .checked_sub_signed(Duration::days(self.config.lookback_days))
            .unwrap_or(NaiveDate::MIN);
        let prior_days = match range.day_before_start() {
            Some(previous) => {
                self.database
                    .get_materialized_days(lookback_start.min(previous), previous)
                    .await?
            }
            None => Vec::new(),
        };
        let seed = seed.or_else(|| {
            prior_days
                .last()
                .filter(|day| range.day_before_start() == Some(day.date))
                .map(SeedState::from)
        });
        let classified = prior_days.iter().map(|day| day.date).collect();

        let facts = self.database.get_daily_facts(lookback_start, range.end()).await?;
        let audited = self.database.audit_keys(lookback_start, range.end()).await?;
        let admitted = self.database.admission_keys(lookback_start, range.end()).await?;

        Ok(LoadedInputs {
            timeline,
            facts,
            audited,
            admitted,
            classified,
            seed,
        })
    }

    async fn compute(&self, range: DateRange, inputs: LoadedInputs) -> AppResult<SeriesOutput> {
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || {
            SeriesEngine::new(&config, &inputs.timeline).compute(&SeriesInput {
                range,
                facts: &inputs.facts,
                audited: &inputs.audited,
                admitted: &inputs.admitted,
                classified: &inputs.classified,
                seed: inputs.seed,
            })
        })
        .await
        .map_err(|e| AppError::internal(format!("Series computation task failed: {e}")))?
        .map_err(AppError::from)
    }

    async fn compute_and_persist(
        &self,
        run_id: Uuid,
        range: DateRange,
        seed: Option<SeedState>,
        state: &mut RunState,
    ) -> AppResult<(u64, u64)> {
        let inputs = self.load_inputs(range, seed).await?;
        info!(
            seeded = inputs.seed.is_some(),
            facts = inputs.facts.len(),
            "Inputs loaded"
        );

        let output = self.compute(range, inputs).await?;
        let computed_at = Utc::now();

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
                    computed_at,
                    run_id,
                }
            })
            .collect();
        let audits: Vec<OutlierAudit> = output
            .exclusions
            .into_iter()
            .map(|exclusion| OutlierAudit {
                date: exclusion.date,
                metric: exclusion.metric,
                original_value: exclusion.original_value,
                rule: exclusion.rule,
                reason: exclusion.reason,
                run_id,
                recorded_at: computed_at,
            })
            .collect();

        *state = state.transition(RunState::Persisting)?;
        self.database.update_run_state(run_id, *state).await?;

        let request = ReplaceRangeRequest {
            range,
            rows: &rows,
            audits: &audits,
        };
        let (database, request) = (&self.database, &request);
        let written = retry_transaction(
            move || database.replace_materialized_range(request),
            PERSIST_MAX_RETRIES,
        )
        .await?;

        Ok((written, audits.len() as u64))
    }
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("config", &self.config)
            .field("held_ranges", &self.locks.held_count())
            .finish_non_exhaustive()
    }
}
