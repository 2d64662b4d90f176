//! Validating and recording new transactions.

use rusqlite::{Connection, TransactionBehavior};

use crate::{
    Error, Money,
    budget::apply_expense,
    transaction::{NewTransaction, Transaction, insert_transaction},
};

/// Validate `new_transaction`, append it to the ledger and count it towards
/// the budget of its category if it is an expense.
///
/// The append and the budget update happen in a single SQL transaction: either
/// both are visible afterwards or neither is. An expense for a category without
/// a budget is still recorded, it just has no budget to count towards yet.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is zero, negative or above [Money::MAX_AMOUNT],
/// - [Error::InvalidCategory] if the category is empty,
/// - or [Error::StorageUnavailable] if the write failed, in which case nothing was written.
pub fn record_transaction(
    new_transaction: NewTransaction,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    if !new_transaction.amount.is_positive() || new_transaction.amount > Money::MAX_AMOUNT {
        return Err(Error::InvalidAmount);
    }

    if new_transaction.category.as_ref().trim().is_empty() {
        return Err(Error::InvalidCategory);
    }

    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let transaction = insert_transaction(&new_transaction, &sql_transaction)?;
    let counted = apply_expense(&transaction, &sql_transaction)?;

    sql_transaction.commit()?;

    tracing::info!(
        "Recorded {} #{} of {} in \"{}\" for user {} (counted towards budget: {counted})",
        transaction.kind,
        transaction.id,
        transaction.amount,
        transaction.category,
        transaction.user_id,
    );

    Ok(transaction)
}
