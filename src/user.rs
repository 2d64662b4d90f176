//! User identifiers and the identity provider seam.
//!
//! The ledger does not authenticate anyone. It trusts the [UserID] handed to
//! it by an [IdentityProvider] and scopes all data by that ID.

use std::fmt::Display;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for UserID {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for UserID {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// Supplies the ID of the already authenticated user.
pub trait IdentityProvider {
    /// The stable identifier of the current user.
    fn current_user_id(&self) -> UserID;
}

/// An identity provider that always answers with the same user.
///
/// Useful for command line tools where the user is chosen up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIdentity(UserID);

impl FixedIdentity {
    /// Create an identity provider for `user_id`.
    pub fn new(user_id: UserID) -> Self {
        Self(user_id)
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_user_id(&self) -> UserID {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedIdentity, IdentityProvider, UserID};

    #[test]
    fn fixed_identity_returns_its_user() {
        let identity = FixedIdentity::new(UserID::new(7));

        assert_eq!(identity.current_user_id(), UserID::new(7));
        assert_eq!(identity.current_user_id().as_i64(), 7);
    }
}
