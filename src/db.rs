//! Opening the ledger database and creating its tables.

use std::{path::Path, time::Duration};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, budget::create_budget_table, transaction::create_transaction_table};

/// Open (or create) the ledger database at `path` and initialize its tables.
///
/// The database is switched to WAL mode with full synchronous writes so that
/// acknowledged writes survive a crash, and `busy_timeout` makes concurrent
/// writers on other connections wait for the lock instead of failing.
///
/// # Errors
/// Returns [Error::StorageUnavailable] if the file cannot be opened or the
/// schema cannot be created.
pub fn open(path: &Path, busy_timeout: Duration) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;
    connection.busy_timeout(busy_timeout)?;

    let journal_mode: String =
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::debug!("Opened {path:?} with journal mode {journal_mode}");

    connection.pragma_update(None, "synchronous", "FULL")?;

    initialize(&connection)?;

    Ok(connection)
}

/// Create the tables for the domain models if they do not exist yet.
///
/// # Errors
/// Returns [Error::StorageUnavailable] if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
