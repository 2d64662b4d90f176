//! Ledger is a library for tracking personal income and expenses and keeping
//! per-category budgets in step with them.
//!
//! The entry point is [Ledger], which owns a SQLite connection and exposes the
//! public operations: recording transactions, setting and checking budgets, and
//! aggregating monthly reports. Every operation returns plain structured data;
//! formatting for humans is left to the caller.

#![warn(missing_docs)]

mod budget;
mod category;
mod config;
mod database_id;
mod db;
mod ledger;
mod logging;
mod money;
mod report;
mod transaction;
mod user;

pub use budget::{BudgetEntry, BudgetStatus};
pub use category::CategoryName;
pub use config::{LedgerConfig, ReportScope};
pub use database_id::{DatabaseId, TransactionId};
pub use db::{initialize as initialize_db, open as open_db};
pub use ledger::Ledger;
pub use logging::init_logging;
pub use money::Money;
pub use report::{MonthlyReport, ReportPeriod};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
pub use user::{FixedIdentity, IdentityProvider, UserID};

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// A transaction amount was zero or negative, a budget amount was
    /// negative, or an amount string could not be parsed.
    #[error("amount is not valid")]
    InvalidAmount,

    /// An empty (or whitespace only) string was used as a category name.
    #[error("category name cannot be empty")]
    InvalidCategory,

    /// The transaction kind was not one of "Income" or "Expense".
    #[error("\"{0}\" is not a valid transaction kind, expected \"Income\" or \"Expense\"")]
    InvalidKind(String),

    /// The report period was not a month ("MM") or year and month ("YYYY-MM").
    #[error("\"{0}\" is not a valid report period, expected \"MM\" or \"YYYY-MM\"")]
    InvalidPeriod(String),

    /// The requested resource was not found.
    ///
    /// Checking a budget for a category that has no budget set returns this
    /// error. Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The database could not be reached or a write failed.
    ///
    /// The operation that returned this error has been rolled back in full,
    /// so the caller may retry it.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::StorageUnavailable(error.to_string())
            }
        }
    }
}
