//! Defines the budget models and the database queries for the budget table.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{CategoryName, Error, Money, UserID};

/// A spending limit for one category of one user, together with how much has
/// been spent in that category so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEntry {
    /// The user the budget belongs to.
    pub user_id: UserID,
    /// The category the budget applies to. Unique per user.
    pub category: CategoryName,
    /// The spending limit. Never negative.
    pub budget_amount: Money,
    /// The sum of the expenses counted towards this budget.
    ///
    /// Only ever changed by recording expenses, never set directly.
    pub spent_amount: Money,
}

/// A snapshot of a budget compared against its spending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStatus {
    /// The category the budget applies to.
    pub category: CategoryName,
    /// The spending limit.
    pub budget_amount: Money,
    /// How much has been spent.
    pub spent_amount: Money,
    /// `budget_amount - spent_amount`, negative once the budget is exceeded.
    pub remaining: Money,
    /// Whether more has been spent than was budgeted.
    pub exceeded: bool,
}

impl From<BudgetEntry> for BudgetStatus {
    fn from(entry: BudgetEntry) -> Self {
        Self {
            remaining: entry.budget_amount - entry.spent_amount,
            exceeded: entry.spent_amount > entry.budget_amount,
            category: entry.category,
            budget_amount: entry.budget_amount,
            spent_amount: entry.spent_amount,
        }
    }
}

const BUDGET_COLUMNS: &str = "user_id, category, budget_amount, spent_amount";

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                category TEXT NOT NULL CHECK (length(category) > 0),
                budget_amount INTEGER NOT NULL CHECK (budget_amount >= 0),
                spent_amount INTEGER NOT NULL DEFAULT 0
                    CHECK (typeof(spent_amount) = 'integer' AND spent_amount >= 0),
                UNIQUE(user_id, category)
                )",
        (),
    )?;

    Ok(())
}

/// Retrieve the budget of `user_id` for `category`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no budget has been set for the category,
/// - or [Error::StorageUnavailable] if there is some other SQL error.
pub fn get_budget_entry(
    user_id: UserID,
    category: &CategoryName,
    connection: &Connection,
) -> Result<BudgetEntry, Error> {
    connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget WHERE user_id = ?1 AND category = ?2"
        ))?
        .query_row((user_id, category.as_ref()), map_budget_row)
        .map_err(|error| error.into())
}

/// Retrieve all budgets of `user_id` ordered by category name.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] if there is an SQL error.
pub fn get_budget_entries(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<BudgetEntry>, Error> {
    connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget WHERE user_id = :user_id ORDER BY category ASC"
        ))?
        .query_map(&[(":user_id", &user_id)], map_budget_row)?
        .map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}

/// Insert a new budget.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] if a budget already
/// exists for the user and category, or if there is some other SQL error.
pub fn insert_budget_entry(entry: &BudgetEntry, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO budget (user_id, category, budget_amount, spent_amount)
         VALUES (?1, ?2, ?3, ?4)",
        (
            entry.user_id,
            entry.category.as_ref(),
            entry.budget_amount,
            entry.spent_amount,
        ),
    )?;

    Ok(())
}

/// Replace the spending limit of an existing budget, leaving its spending as is.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no budget has been set for the category,
/// - or [Error::StorageUnavailable] if there is some other SQL error.
pub fn update_budget_amount(
    user_id: UserID,
    category: &CategoryName,
    budget_amount: Money,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE budget SET budget_amount = ?1 WHERE user_id = ?2 AND category = ?3",
        (budget_amount, user_id, category.as_ref()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Atomically add `amount` to the spending of a budget.
///
/// The addition is done by SQLite in a single statement, so concurrent
/// increments cannot overwrite each other.
///
/// Returns `false` if there is no budget for the user and category.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] if there is an SQL error.
pub fn increment_spent(
    user_id: UserID,
    category: &CategoryName,
    amount: Money,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "UPDATE budget SET spent_amount = spent_amount + ?1 WHERE user_id = ?2 AND category = ?3",
        (amount, user_id, category.as_ref()),
    )?;

    Ok(rows_affected > 0)
}

fn map_budget_row(row: &Row) -> Result<BudgetEntry, rusqlite::Error> {
    let user_id = row.get(0)?;
    let raw_category: String = row.get(1)?;
    let budget_amount = row.get(2)?;
    let spent_amount = row.get(3)?;

    Ok(BudgetEntry {
        user_id,
        category: CategoryName::new_unchecked(&raw_category),
        budget_amount,
        spent_amount,
    })
}
