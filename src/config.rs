//! Runtime configuration for a [Ledger](crate::Ledger).

use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// How a monthly report matches transactions to a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportScope {
    /// Match on the month alone, so "05" includes May of every year.
    #[default]
    MonthOnly,
    /// Match on year and month. A bare month is taken to be in the current year.
    YearAndMonth,
}

impl FromStr for ReportScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "month_only" => Ok(Self::MonthOnly),
            "year_and_month" => Ok(Self::YearAndMonth),
            other => Err(format!(
                "unknown report scope \"{other}\", expected \"month-only\" or \"year-and-month\""
            )),
        }
    }
}

impl Display for ReportScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonthOnly => write!(f, "month-only"),
            Self::YearAndMonth => write!(f, "year-and-month"),
        }
    }
}

/// Settings that control where the ledger is stored and how it behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// File path to the SQLite database.
    pub db_path: PathBuf,

    /// How long a write waits for another connection's lock before giving up.
    pub busy_timeout_ms: u64,

    /// How monthly reports match transactions to a period.
    pub report_scope: ReportScope,

    /// Whether a newly created budget counts expenses recorded before it.
    ///
    /// When `false`, a budget only counts expenses recorded after it was created.
    pub backfill_on_create: bool,
}

impl LedgerConfig {
    /// The default file name of the ledger database.
    pub const DEFAULT_DB_PATH: &str = "ledger.db";

    /// The default busy timeout in milliseconds.
    pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

    /// The busy timeout as a [Duration].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(Self::DEFAULT_DB_PATH),
            busy_timeout_ms: Self::DEFAULT_BUSY_TIMEOUT_MS,
            report_scope: ReportScope::default(),
            backfill_on_create: true,
        }
    }
}
