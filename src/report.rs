//! Report identity
//!
//! A podcast session always narrates one report, identified by its kind
//! (daily or weekly) and an optional target date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Date format understood by the backend (`YYYY-MM-DD`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("unknown report kind '{0}' (expected 'daily' or 'weekly')")]
    UnknownKind(String),

    #[error("invalid report date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Which digest the podcast narrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Daily,
    Weekly,
}

impl ReportKind {
    pub const ALL: [ReportKind; 2] = [ReportKind::Daily, ReportKind::Weekly];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::Weekly => "weekly",
        }
    }

    /// Synthesis endpoint path for this kind
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReportKind::Daily => "/audio/daily",
            ReportKind::Weekly => "/audio/weekly",
        }
    }

    /// Human-readable podcast title
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Daily => "Daily Podcast",
            ReportKind::Weekly => "Weekly Podcast",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportKind::Daily),
            "weekly" => Ok(ReportKind::Weekly),
            other => Err(ReportError::UnknownKind(other.to_string())),
        }
    }
}

/// The report a session's audio corresponds to; fixed for the session's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportContext {
    pub kind: ReportKind,
    pub target_date: Option<NaiveDate>,
}

impl ReportContext {
    pub fn new(kind: ReportKind, target_date: Option<NaiveDate>) -> Self {
        Self { kind, target_date }
    }

    pub fn daily() -> Self {
        Self::new(ReportKind::Daily, None)
    }

    pub fn weekly() -> Self {
        Self::new(ReportKind::Weekly, None)
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }

    /// Parse a `YYYY-MM-DD` target date
    pub fn parse_date(value: &str) -> Result<NaiveDate, ReportError> {
        NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
            .map_err(|_| ReportError::InvalidDate(value.to_string()))
    }

    /// Target date rendered the way the backend expects it
    pub fn date_param(&self) -> Option<String> {
        self.target_date
            .map(|date| date.format(DATE_FORMAT).to_string())
    }

    /// File name offered by the download affordance, e.g. `daily_podcast.mp3`
    pub fn download_name(&self, extension: &str) -> String {
        format!("{}_podcast.{}", self.kind, extension)
    }
}

impl fmt::Display for ReportContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date_param() {
            Some(date) => write!(f, "{} ({})", self.kind, date),
            None => write!(f, "{} (latest)", self.kind),
        }
    }
}
