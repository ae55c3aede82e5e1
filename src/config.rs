use anyhow::Context;

use crate::error::IngestError;
use crate::extract::{Extractor, DEFAULT_STATUS_MARKER};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Settings read once at startup and handed to the store and extractor.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub status_marker: String,
    /// Overrides the comma-decimal percentage pattern when set.
    pub percent_pattern: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let max_connections = match std::env::var("ATTENDANCE_DB_MAX_CONNECTIONS") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("invalid ATTENDANCE_DB_MAX_CONNECTIONS: {value}"))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        let status_marker = std::env::var("ATTENDANCE_STATUS_MARKER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS_MARKER.to_string());

        let percent_pattern = std::env::var("ATTENDANCE_PERCENT_PATTERN")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url,
            max_connections,
            status_marker,
            percent_pattern,
        })
    }

    pub fn extractor(&self) -> Result<Extractor, IngestError> {
        match &self.percent_pattern {
            Some(pattern) => Extractor::with_percent_pattern(&self.status_marker, pattern),
            None => Ok(Extractor::standard(&self.status_marker)),
        }
    }
}
