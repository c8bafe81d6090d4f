// ABOUTME: Raw daily fact row as delivered by ingestion, every measurement optional
// ABOUTME: BodyMetric names the smoothed body-composition series
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// One calendar day of raw measurements
///
/// A `None` field means nothing was observed that day; it is never coerced to zero here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFact {
    /// Calendar date
    pub date: NaiveDate,
    /// Energy intake (kcal)
    #[serde(default)]
    pub intake_kcal: Option<f64>,
    /// Protein (g)
    #[serde(default)]
    pub protein_g: Option<f64>,
    /// Carbohydrate (g)
    #[serde(default)]
    pub carbohydrate_g: Option<f64>,
    /// Fat (g)
    #[serde(default)]
    pub fat_g: Option<f64>,
    /// Fiber (g)
    #[serde(default)]
    pub fiber_g: Option<f64>,
    /// Exercise energy expenditure (kcal)
    #[serde(default)]
    pub exercise_kcal: Option<f64>,
    /// Body weight (kg)
    #[serde(default)]
    pub body_weight_kg: Option<f64>,
    /// Fat mass (kg)
    #[serde(default)]
    pub fat_mass_kg: Option<f64>,
    /// Fat-free mass (kg)
    #[serde(default)]
    pub fat_free_mass_kg: Option<f64>,
}

impl DailyFact {
    /// A fact with no observations
    #[must_use]
    pub const fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            intake_kcal: None,
            protein_g: None,
            carbohydrate_g: None,
            fat_g: None,
            fiber_g: None,
            exercise_kcal: None,
            body_weight_kg: None,
            fat_mass_kg: None,
            fat_free_mass_kg: None,
        }
    }

    /// Raw observation for a body-composition metric
    #[must_use]
    pub const fn metric(&self, metric: BodyMetric) -> Option<f64> {
        match metric {
            BodyMetric::FatMass => self.fat_mass_kg,
            BodyMetric::FatFreeMass => self.fat_free_mass_kg,
        }
    }
}

/// Body-composition series carried by the smoother
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyMetric {
    /// Fat mass
    FatMass,
    /// Fat-free (lean) mass
    FatFreeMass,
}

impl BodyMetric {
    /// Every smoothed metric in processing order
    pub const ALL: [Self; 2] = [Self::FatMass, Self::FatFreeMass];

    /// Stable storage name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FatMass => "fat_mass",
            Self::FatFreeMass => "fat_free_mass",
        }
    }
}

impl fmt::Display for BodyMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BodyMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fat_mass" => Ok(Self::FatMass),
            "fat_free_mass" | "lean_mass" => Ok(Self::FatFreeMass),
            other => Err(AppError::invalid_input(format!(
                "unknown metric '{other}' (expected fat_mass or fat_free_mass)"
            ))),
        }
    }
}
