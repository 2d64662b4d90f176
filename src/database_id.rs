//! Database ID type definition.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of a recorded transaction.
///
/// IDs are assigned by the ledger store, are never reused and strictly
/// increase in the order transactions were recorded.
pub type TransactionId = DatabaseId;
