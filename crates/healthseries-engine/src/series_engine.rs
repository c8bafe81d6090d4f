// ABOUTME: Sequential fold over a date range producing smoothed and derived daily values
// ABOUTME: Classifies readings, gap-fills, smooths and derives metrics without any I/O
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Series computation
//!
//! The whole range is computed in memory in strict date order. The accumulator is
//! a [`SeedState`] `{fat_mass, lean_mass, fat_mass_variance}`; each day's state
//! depends only on the previous day's state and that day's inputs, so a range
//! seeded with the true state of the day before its start reproduces a single pass.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use healthseries_core::errors::MaterializationError;
use healthseries_core::models::{BodyMetric, DailyFact, DateRange, OutlierRule, SeedState};

use crate::config::{EngineConfig, FatMassEstimator};
use crate::derived_metrics::DerivedMetrics;
use crate::gap_fill::{FilledValue, GapFillSource};
use crate::outlier_detection::{Observation, OutlierDetector};
use crate::parameter_timeline::ParameterTimeline;
use crate::smoother::{EmaSmoother, KalmanEstimator, KalmanState};

/// `(date, metric)` key used for audit and admission lookups
pub type ReadingKey = (NaiveDate, BodyMetric);

/// Everything the fold reads, loaded once before the pass
#[derive(Debug, Clone)]
pub struct SeriesInput<'a> {
    /// Dates to compute
    pub range: DateRange,
    /// Raw facts for the lookback window and the range
    pub facts: &'a BTreeMap<NaiveDate, DailyFact>,
    /// Readings excluded by earlier runs
    pub audited: &'a HashSet<ReadingKey>,
    /// Readings a reviewer has admitted
    pub admitted: &'a HashSet<ReadingKey>,
    /// Lookback dates with a stored row; their readings were classified by an earlier run
    pub classified: &'a HashSet<NaiveDate>,
    /// State of the day before `range.start()`, if known
    pub seed: Option<SeedState>,
}

/// One computed day before persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedDay {
    /// Calendar date
    pub date: NaiveDate,
    /// Smoothed state after this day
    pub state: SeedState,
    /// Unrounded derived metrics
    pub metrics: DerivedMetrics,
    /// Parameter version applied
    pub parameter_version_id: String,
}

/// Reading newly excluded during this pass
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    /// Date of the reading
    pub date: NaiveDate,
    /// Metric of the reading
    pub metric: BodyMetric,
    /// Value as ingested
    pub original_value: f64,
    /// Rule that fired
    pub rule: OutlierRule,
    /// Explanation
    pub reason: String,
}

/// Result of a pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesOutput {
    /// One entry per date in the range
    pub days: Vec<ComputedDay>,
    /// New exclusions to audit
    pub exclusions: Vec<Exclusion>,
}

impl SeriesOutput {
    /// State after the last computed day
    #[must_use]
    pub fn final_state(&self) -> Option<SeedState> {
        self.days.last().map(|day| day.state)
    }
}

/// Admitted history and forward-fill source for one metric
struct MetricTrack {
    metric: BodyMetric,
    history: Vec<Observation>,
    fill: GapFillSource,
}

impl MetricTrack {
    /// Replay the lookback before `range.start()` in date order
    ///
    /// Readings on already classified dates keep their stored verdict; the rest
    /// go through the same rules as readings inside the range and are dropped
    /// silently when they fail, since their dates are not rewritten by this run.
    fn from_lookback(
        metric: BodyMetric,
        input: &SeriesInput<'_>,
        detector: &OutlierDetector<'_>,
    ) -> Self {
        let mut track = Self {
            metric,
            history: Vec::new(),
            fill: GapFillSource::new(),
        };

        for (date, fact) in input.facts.range(..input.range.start()) {
            let Some(value) = fact.metric(metric).filter(|v| v.is_finite()) else {
                continue;
            };
            let key = (*date, metric);
            if input.admitted.contains(&key) {
                track.admit(*date, value);
                continue;
            }
            if input.audited.contains(&key) {
                continue;
            }
            if input.classified.contains(date)
                || !detector.is_outlier(metric, *date, Some(value), &track.history)
            {
                track.admit(*date, value);
            } else {
                debug!(date = %date, metric = %metric, value, "lookback reading dropped");
            }
        }
        track
    }

    fn admit(&mut self, date: NaiveDate, value: f64) {
        self.history.push(Observation::new(date, value));
        self.fill.admit(date, value);
    }

    /// Admit or exclude today's reading; returns a new exclusion to audit
    fn classify(
        &mut self,
        date: NaiveDate,
        raw: Option<f64>,
        input: &SeriesInput<'_>,
        detector: &OutlierDetector<'_>,
    ) -> Option<Exclusion> {
        let value = raw?;
        let key = (date, self.metric);

        if input.admitted.contains(&key) && value.is_finite() {
            self.admit(date, value);
            return None;
        }
        if input.audited.contains(&key) {
            return None;
        }

        match detector.detect(self.metric, date, Some(value), &self.history) {
            Some(verdict) => {
                debug!(
                    %date,
                    metric = %self.metric,
                    rule = %verdict.rule,
                    value,
                    "reading excluded"
                );
                Some(Exclusion {
                    date,
                    metric: self.metric,
                    original_value: value,
                    rule: verdict.rule,
                    reason: verdict.reason,
                })
            }
            None => {
                self.admit(date, value);
                None
            }
        }
    }

    fn resolve(&self, date: NaiveDate) -> Option<FilledValue> {
        self.fill.resolve_value(date)
    }
}

/// Sequential series computation over an explicit parameter timeline
#[derive(Debug, Clone, Copy)]
pub struct SeriesEngine<'a> {
    config: &'a EngineConfig,
    timeline: &'a ParameterTimeline,
}

impl<'a> SeriesEngine<'a> {
    /// Create an engine for one run
    #[must_use]
    pub const fn new(config: &'a EngineConfig, timeline: &'a ParameterTimeline) -> Self {
        Self { config, timeline }
    }

    /// Compute every day in `input.range`
    ///
    /// # Errors
    ///
    /// - `NoParameterVersion` if any date in the range is uncovered (checked before computing)
    /// - `UnseedableMetric` if no seed is given and a metric has no value at the first date
    pub fn compute(&self, input: &SeriesInput<'_>) -> Result<SeriesOutput, MaterializationError> {
        self.timeline.check_coverage(&input.range)?;

        let detector = OutlierDetector::new(&self.config.outliers);
        let kalman = match self.config.smoothing.fat_mass_estimator {
            FatMassEstimator::Kalman => Some(KalmanEstimator::from_config(&self.config.smoothing)),
            FatMassEstimator::Ema => None,
        };

        let mut fat = MetricTrack::from_lookback(BodyMetric::FatMass, input, &detector);
        let mut lean = MetricTrack::from_lookback(BodyMetric::FatFreeMass, input, &detector);

        let mut output = SeriesOutput {
            days: Vec::with_capacity(usize::try_from(input.range.len_days()).unwrap_or(0)),
            exclusions: Vec::new(),
        };
        let mut state = input.seed;

        for date in input.range.days() {
            let params = self.timeline.resolve(date)?;
            let fact = input.facts.get(&date);

            for track in [&mut fat, &mut lean] {
                let raw = fact.and_then(|f| f.metric(track.metric));
                if let Some(exclusion) = track.classify(date, raw, input, &detector) {
                    output.exclusions.push(exclusion);
                }
            }

            let next = match state {
                None => cold_seed(date, &fat, &lean, kalman.as_ref())?,
                Some(prior) => {
                    let lean_mass_kg = lean.resolve(date).map_or(prior.lean_mass_kg, |filled| {
                        EmaSmoother::advance(
                            prior.lean_mass_kg,
                            filled.value,
                            1,
                            params.alpha_for(BodyMetric::FatFreeMass),
                        )
                    });

                    match kalman.as_ref() {
                        Some(filter) => {
                            let prior_state = prior.fat_mass_variance.map_or_else(
                                || filter.seed(prior.fat_mass_kg),
                                |variance| KalmanState {
                                    estimate: prior.fat_mass_kg,
                                    variance,
                                },
                            );
                            // filled values never update the filter
                            let posterior =
                                filter.advance(prior_state, 1, fat.fill.observed_on(date));
                            SeedState {
                                fat_mass_kg: posterior.estimate,
                                lean_mass_kg,
                                fat_mass_variance: Some(posterior.variance),
                            }
                        }
                        None => SeedState {
                            fat_mass_kg: fat.resolve(date).map_or(prior.fat_mass_kg, |filled| {
                                EmaSmoother::advance(
                                    prior.fat_mass_kg,
                                    filled.value,
                                    1,
                                    params.alpha_for(BodyMetric::FatMass),
                                )
                            }),
                            lean_mass_kg,
                            fat_mass_variance: None,
                        },
                    }
                }
            };

            let metrics = DerivedMetrics::compute(
                next.lean_mass_kg,
                fact.and_then(|f| f.intake_kcal),
                fact.and_then(|f| f.exercise_kcal),
                params,
            );

            output.days.push(ComputedDay {
                date,
                state: next,
                metrics,
                parameter_version_id: params.version_id.clone(),
            });
            state = Some(next);
        }

        Ok(output)
    }
}

/// Initial state at the first date of a from-scratch pass
fn cold_seed(
    date: NaiveDate,
    fat: &MetricTrack,
    lean: &MetricTrack,
    kalman: Option<&KalmanEstimator>,
) -> Result<SeedState, MaterializationError> {
    let fat_value = fat
        .resolve(date)
        .ok_or(MaterializationError::UnseedableMetric {
            metric: BodyMetric::FatMass,
            date,
        })?;
    let lean_value = lean
        .resolve(date)
        .ok_or(MaterializationError::UnseedableMetric {
            metric: BodyMetric::FatFreeMass,
            date,
        })?;

    Ok(SeedState {
        fat_mass_kg: fat_value.value,
        lean_mass_kg: lean_value.value,
        fat_mass_variance: kalman.map(|filter| filter.seed(fat_value.value).variance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthseries_core::models::ParameterVersion;

    fn date(day: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default() + chrono::Duration::days(day)
    }

    fn timeline() -> ParameterTimeline {
        ParameterTimeline::new(vec![ParameterVersion {
            version_id: "v1".into(),
            effective_start_date: date(0),
            effective_end_date: None,
            alpha_fat_mass: 0.25,
            alpha_lean_mass: 0.1,
            bmr_intercept_kcal: 370.0,
            bmr_slope_kcal_per_kg_lean: 21.6,
            exercise_compensation_fraction: 0.2,
            energy_density_kcal_per_kg_fat: 7700.0,
        }])
    }

    fn fact(day: i64, fat: Option<f64>, lean: Option<f64>) -> DailyFact {
        DailyFact {
            fat_mass_kg: fat,
            fat_free_mass_kg: lean,
            intake_kcal: Some(2200.0),
            ..DailyFact::empty(date(day))
        }
    }

    fn range(start: i64, end: i64) -> DateRange {
        DateRange::new(date(start), date(end)).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_seeded_scenario_matches_hand_computation() {
        let facts: BTreeMap<_, _> = [
            fact(1, Some(20.4), Some(50.0)),
            fact(2, None, None),
            fact(3, Some(19.8), Some(50.0)),
        ]
        .into_iter()
        .map(|f| (f.date, f))
        .collect();
        let empty = HashSet::new();
        let config = EngineConfig::default();
        let timeline = timeline();
        let engine = SeriesEngine::new(&config, &timeline);

        let output = engine
            .compute(&SeriesInput {
                range: range(1, 3),
                facts: &facts,
                audited: &empty,
                admitted: &empty,
                classified: &HashSet::new(),
                seed: Some(SeedState::new(20.0, 50.0)),
            })
            .unwrap_or_default();

        let fat: Vec<f64> = output.days.iter().map(|d| d.state.fat_mass_kg).collect();
        assert_eq!(fat.len(), 3);
        assert!((fat[0] - 20.1).abs() < 1e-9);
        assert!((fat[1] - 20.175).abs() < 1e-9);
        assert!((fat[2] - 20.081_25).abs() < 1e-9);
    }

    #[test]
    fn test_cold_start_without_value_is_unseedable() {
        let facts: BTreeMap<_, _> = [fact(0, None, Some(50.0)), fact(1, Some(20.0), Some(50.0))]
            .into_iter()
            .map(|f| (f.date, f))
            .collect();
        let empty = HashSet::new();
        let config = EngineConfig::default();
        let timeline = timeline();
        let engine = SeriesEngine::new(&config, &timeline);

        let result = engine.compute(&SeriesInput {
            range: range(0, 1),
            facts: &facts,
            audited: &empty,
            admitted: &empty,
            classified: &HashSet::new(),
            seed: None,
        });
        assert_eq!(
            result,
            Err(MaterializationError::UnseedableMetric {
                metric: BodyMetric::FatMass,
                date: date(0),
            })
        );
    }

    #[test]
    fn test_audited_reading_is_excluded_without_new_exclusion() {
        let facts: BTreeMap<_, _> = [
            fact(0, Some(20.0), Some(50.0)),
            fact(1, Some(20.2), Some(50.0)),
        ]
        .into_iter()
        .map(|f| (f.date, f))
        .collect();
        let audited: HashSet<ReadingKey> = [(date(1), BodyMetric::FatMass)].into_iter().collect();
        let empty = HashSet::new();
        let config = EngineConfig::default();
        let timeline = timeline();
        let engine = SeriesEngine::new(&config, &timeline);

        let output = engine
            .compute(&SeriesInput {
                range: range(0, 1),
                facts: &facts,
                audited: &audited,
                admitted: &empty,
                classified: &HashSet::new(),
                seed: None,
            })
            .unwrap_or_default();

        assert!(output.exclusions.is_empty());
        // day 1 fills with day 0's 20.0, so the EMA stays put
        assert!(output
            .final_state()
            .is_some_and(|s| (s.fat_mass_kg - 20.0).abs() < 1e-12));
    }

    #[test]
    fn test_implausible_lookback_reading_never_seeds_the_range() {
        let mut facts: BTreeMap<_, _> = (0..=12)
            .map(|d| fact(d, Some(20.0), Some(50.0)))
            .map(|f| (f.date, f))
            .collect();
        facts.insert(date(9), fact(9, Some(200.0), Some(50.0)));
        let empty = HashSet::new();
        let config = EngineConfig::default();
        let timeline = timeline();
        let engine = SeriesEngine::new(&config, &timeline);

        let output = engine
            .compute(&SeriesInput {
                range: range(10, 12),
                facts: &facts,
                audited: &empty,
                admitted: &empty,
                classified: &HashSet::new(),
                seed: None,
            })
            .unwrap_or_default();

        assert_eq!(output.days.len(), 3);
        assert!(output.exclusions.is_empty());
        assert!(output
            .days
            .iter()
            .all(|d| (d.state.fat_mass_kg - 20.0).abs() < 1e-12));
    }

    #[test]
    fn test_kalman_variance_is_carried_in_state() {
        let facts: BTreeMap<_, _> = [
            fact(0, Some(20.0), Some(50.0)),
            fact(1, None, Some(50.0)),
            fact(2, Some(20.1), Some(50.0)),
        ]
        .into_iter()
        .map(|f| (f.date, f))
        .collect();
        let empty = HashSet::new();
        let mut config = EngineConfig::default();
        config.smoothing.fat_mass_estimator = FatMassEstimator::Kalman;
        let timeline = timeline();
        let engine = SeriesEngine::new(&config, &timeline);

        let output = engine
            .compute(&SeriesInput {
                range: range(0, 2),
                facts: &facts,
                audited: &empty,
                admitted: &empty,
                classified: &HashSet::new(),
                seed: None,
            })
            .unwrap_or_default();

        let variances: Vec<f64> = output
            .days
            .iter()
            .filter_map(|d| d.state.fat_mass_variance)
            .collect();
        assert_eq!(variances.len(), 3);
        assert!(variances[1] > variances[0]);
        assert!(variances[2] < variances[1]);
    }
}
