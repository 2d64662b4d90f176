//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CategoryName, Error, Money, UserID, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Money coming in, e.g. a salary payment.
    Income,
    /// Money going out. Expenses count towards the budget of their category.
    Expense,
}

impl TransactionKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    /// Parse a kind, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    /// Returns [Error::InvalidKind] for anything other than "income" or "expense".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(Error::InvalidKind(s.to_owned())),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// An income or expense, i.e. an event where money was either earned or spent.
///
/// Transactions are immutable once recorded. To record a new one, start with
/// [Transaction::build].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction, assigned by the ledger store.
    pub id: TransactionId,
    /// The user the transaction belongs to.
    pub user_id: UserID,
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,
    /// The category, e.g. "Groceries", "Transport", "Salary".
    pub category: CategoryName,
    /// The amount of money earned or spent. Always positive.
    pub amount: Money,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Transaction {
    /// Start building a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(
        user_id: UserID,
        kind: TransactionKind,
        category: CategoryName,
        amount: Money,
    ) -> NewTransaction {
        NewTransaction {
            user_id,
            kind,
            category,
            amount,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// A transaction that has not been recorded yet.
///
/// The timestamp defaults to the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// The user the transaction belongs to.
    pub user_id: UserID,
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,
    /// The category of the transaction.
    pub category: CategoryName,
    /// The amount of money. Must be strictly positive to be recorded.
    pub amount: Money,
    /// When the transaction happened.
    pub timestamp: OffsetDateTime,
}

impl NewTransaction {
    /// Set when the transaction happened.
    pub fn timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str = "id, user_id, kind, category, amount, timestamp";

/// Append a transaction to the ledger and return it with its new ID.
///
/// This does not validate the transaction or touch any budget. Use
/// [record_transaction](super::record_transaction) for that.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] if there is an SQL error.
pub fn insert_transaction(
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, kind, category, amount, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                new_transaction.user_id,
                new_transaction.kind,
                new_transaction.category.as_ref(),
                new_transaction.amount,
                new_transaction.timestamp,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::StorageUnavailable] there is some other SQL error.
#[cfg(test)]
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve the transactions of `user_id` that satisfy `predicate`, in the
/// order they were recorded.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] if there is an SQL error.
pub fn query_transactions_by_user(
    user_id: UserID,
    predicate: impl Fn(&Transaction) -> bool,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut transactions = Vec::new();

    let mut statement = connection.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE user_id = :user_id ORDER BY id ASC"
    ))?;
    let rows = statement.query_map(&[(":user_id", &user_id)], map_transaction_row)?;

    for row in rows {
        let transaction = row?;

        if predicate(&transaction) {
            transactions.push(transaction);
        }
    }

    Ok(transactions)
}

/// The total of all expenses recorded for `user_id` in `category`.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] if there is an SQL error.
pub fn sum_expenses(
    user_id: UserID,
    category: &CategoryName,
    connection: &Connection,
) -> Result<Money, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM \"transaction\"
             WHERE user_id = ?1 AND category = ?2 AND kind = ?3",
            (user_id, category.as_ref(), TransactionKind::Expense),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<usize, Error> {
    let count: i64 =
        connection.query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| row.get(0))?;

    usize::try_from(count).map_err(|error| Error::StorageUnavailable(error.to_string()))
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    // AUTOINCREMENT stops IDs from being reused, so IDs give the recording order.
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('Income', 'Expense')),
                category TEXT NOT NULL CHECK (length(category) > 0),
                amount INTEGER NOT NULL CHECK (amount > 0),
                timestamp TEXT NOT NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT INTO sqlite_sequence (name, seq)
         SELECT 'transaction', 0
         WHERE NOT EXISTS (SELECT 1 FROM sqlite_sequence WHERE name = 'transaction')",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_category
         ON \"transaction\"(user_id, category, kind);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let kind = row.get(2)?;
    let raw_category: String = row.get(3)?;
    let amount = row.get(4)?;
    let timestamp = row.get(5)?;

    Ok(Transaction {
        id,
        user_id,
        kind,
        category: CategoryName::new_unchecked(&raw_category),
        amount,
        timestamp,
    })
}

// ============================================================================
// TESTS
// ============================================================================
