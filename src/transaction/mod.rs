//! Transactions for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `NewTransaction` builder
//! - Database functions for appending and querying transactions
//! - The recorder that validates transactions and keeps budgets in step

mod core;
mod record;

pub use core::{
    NewTransaction, Transaction, TransactionKind, count_transactions, create_transaction_table,
    query_transactions_by_user, sum_expenses,
};
pub use record::record_transaction;

pub(crate) use core::insert_transaction;

#[cfg(test)]
pub(crate) use core::get_transaction;
