//! Keeps the spending of each budget in step with recorded expenses and
//! answers questions about budgets.

use rusqlite::{Connection, TransactionBehavior};

use crate::{
    CategoryName, Error, Money, Transaction, TransactionKind, UserID,
    budget::{
        BudgetEntry, BudgetStatus, get_budget_entries, get_budget_entry, increment_spent,
        insert_budget_entry, update_budget_amount,
    },
    transaction::sum_expenses,
};

/// Set the spending limit of `user_id` for `category`.
///
/// An existing budget keeps what has been spent so far and only has its limit
/// replaced. A new budget starts from the sum of the category's earlier
/// expenses when `backfill` is true, and from zero otherwise.
///
/// The lookup, backfill and write happen in a single SQL transaction that
/// takes the write lock up front, so no expense can be recorded in between.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `budget_amount` is negative or above [Money::MAX_AMOUNT],
/// - or [Error::StorageUnavailable] if the write failed, in which case nothing was written.
pub fn set_budget(
    user_id: UserID,
    category: &CategoryName,
    budget_amount: Money,
    backfill: bool,
    connection: &mut Connection,
) -> Result<BudgetEntry, Error> {
    if budget_amount.is_negative() || budget_amount > Money::MAX_AMOUNT {
        return Err(Error::InvalidAmount);
    }

    if category.as_ref().trim().is_empty() {
        return Err(Error::InvalidCategory);
    }

    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let entry = match get_budget_entry(user_id, category, &sql_transaction) {
        Ok(existing) => {
            update_budget_amount(user_id, category, budget_amount, &sql_transaction)?;
            tracing::info!(
                "Replaced budget for \"{category}\" of user {user_id}: {} -> {budget_amount}",
                existing.budget_amount
            );

            BudgetEntry {
                budget_amount,
                ..existing
            }
        }
        Err(Error::NotFound) => {
            let spent_amount = if backfill {
                sum_expenses(user_id, category, &sql_transaction)?
            } else {
                Money::ZERO
            };
            tracing::debug!("Backfilled {spent_amount} of spending for \"{category}\"");

            let entry = BudgetEntry {
                user_id,
                category: category.clone(),
                budget_amount,
                spent_amount,
            };
            insert_budget_entry(&entry, &sql_transaction)?;
            tracing::info!("Created budget of {budget_amount} for \"{category}\" of user {user_id}");

            entry
        }
        Err(error) => return Err(error),
    };

    sql_transaction.commit()?;

    Ok(entry)
}

/// Count an expense towards the budget of its category, if there is one.
///
/// Income is ignored. Returns whether the transaction was counted.
///
/// Callers should run this in the same SQL transaction that recorded
/// `transaction` so that both are applied together.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] if there is an SQL error.
pub fn apply_expense(transaction: &Transaction, connection: &Connection) -> Result<bool, Error> {
    match transaction.kind {
        TransactionKind::Income => Ok(false),
        TransactionKind::Expense => increment_spent(
            transaction.user_id,
            &transaction.category,
            transaction.amount,
            connection,
        ),
    }
}

/// Compare the budget of `user_id` for `category` against its spending.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no budget has been set for the category,
/// - or [Error::StorageUnavailable] if there is some other SQL error.
pub fn check_budget(
    user_id: UserID,
    category: &CategoryName,
    connection: &Connection,
) -> Result<BudgetStatus, Error> {
    get_budget_entry(user_id, category, connection).map(BudgetStatus::from)
}

/// The status of every budget of `user_id`, sorted by category name.
///
/// # Errors
/// This function will return a [Error::StorageUnavailable] if there is an SQL error.
pub fn list_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<BudgetStatus>, Error> {
    let statuses = get_budget_entries(user_id, connection)?
        .into_iter()
        .map(BudgetStatus::from)
        .collect();

    Ok(statuses)
}
