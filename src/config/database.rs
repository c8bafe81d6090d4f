// ABOUTME: Database configuration types for SQLite connections
// ABOUTME: Parses DATABASE_URL into a file-backed or in-memory SQLite target
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

/// Default on-disk database
const DEFAULT_DATABASE_PATH: &str = "./data/healthseries.db";

/// Default pool size for file-backed databases
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Path to `SQLite` database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string with validation
    ///
    /// Accepts `sqlite:PATH`, `sqlite::memory:` or a bare file path.
    ///
    /// # Errors
    ///
    /// Returns an error for empty input or a non-`SQLite` scheme
    pub fn parse_url(s: &str) -> AppResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("database URL must not be empty"));
        }
        if let Some(path_str) = trimmed.strip_prefix("sqlite:") {
            let path_str = path_str.trim_start_matches("//");
            return if path_str == ":memory:" {
                Ok(Self::Memory)
            } else if path_str.is_empty() {
                Err(AppError::invalid_input("sqlite URL is missing a file path"))
            } else {
                Ok(Self::SQLite {
                    path: PathBuf::from(path_str),
                })
            };
        }
        if trimmed.contains("://") {
            return Err(AppError::invalid_input(format!(
                "unsupported database URL '{trimmed}' (only sqlite is supported)"
            )));
        }
        Ok(Self::SQLite {
            path: PathBuf::from(trimmed),
        })
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database location
    pub url: DatabaseUrl,
    /// Maximum pooled connections (forced to 1 for in-memory databases)
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DatabaseUrl::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` or `DATABASE_MAX_CONNECTIONS` is invalid
    pub fn from_env() -> AppResult<Self> {
        let url = match env::var("DATABASE_URL") {
            Ok(raw) => DatabaseUrl::parse_url(&raw)?,
            Err(_) => DatabaseUrl::default(),
        };
        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| {
                AppError::config(format!("Invalid DATABASE_MAX_CONNECTIONS value: {e}"))
            })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            return Err(AppError::config("DATABASE_MAX_CONNECTIONS must be > 0"));
        }
        Ok(Self {
            url,
            max_connections,
        })
    }
}
