//! Read-only aggregation of transactions into reports.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use rusqlite::Connection;
use time::{Month, OffsetDateTime};

use crate::{Error, Money, ReportScope, TransactionKind, UserID, transaction::query_transactions_by_user};

/// The total amount of each kind of transaction within a period.
///
/// Kinds without any transactions in the period are left out, so a period
/// without transactions gives an empty report.
pub type MonthlyReport = BTreeMap<TransactionKind, Money>;

/// The month a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    /// A month with no year, parsed from "MM".
    Month(Month),
    /// A month of a specific year, parsed from "YYYY-MM".
    YearMonth {
        /// The calendar year.
        year: i32,
        /// The month of `year`.
        month: Month,
    },
}

impl ReportPeriod {
    /// Parse a period from "MM" (e.g. "05") or "YYYY-MM" (e.g. "2025-05").
    ///
    /// # Errors
    /// Returns [Error::InvalidPeriod] if `text` is neither form or the month is
    /// not between 01 and 12.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidPeriod(text.to_owned());
        let trimmed = text.trim();

        let parse_month = |digits: &str| -> Result<Month, Error> {
            if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }

            let number: u8 = digits.parse().map_err(|_| invalid())?;
            Month::try_from(number).map_err(|_| invalid())
        };

        match trimmed.split_once('-') {
            None => Ok(Self::Month(parse_month(trimmed)?)),
            Some((year, month)) => {
                if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }

                Ok(Self::YearMonth {
                    year: year.parse().map_err(|_| invalid())?,
                    month: parse_month(month)?,
                })
            }
        }
    }

    /// The month component of the period.
    pub fn month(&self) -> Month {
        match self {
            Self::Month(month) | Self::YearMonth { month, .. } => *month,
        }
    }

    /// Whether `timestamp` falls inside the period.
    ///
    /// With [ReportScope::MonthOnly] only the month is compared and any year
    /// is ignored. With [ReportScope::YearAndMonth] a period without a year
    /// is taken to be in `current_year`.
    pub fn contains(&self, timestamp: OffsetDateTime, scope: ReportScope, current_year: i32) -> bool {
        if timestamp.month() != self.month() {
            return false;
        }

        match (scope, self) {
            (ReportScope::MonthOnly, _) => true,
            (ReportScope::YearAndMonth, Self::Month(_)) => timestamp.year() == current_year,
            (ReportScope::YearAndMonth, Self::YearMonth { year, .. }) => timestamp.year() == *year,
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportPeriod::parse(s)
    }
}

impl Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Month(month) => write!(f, "{:02}", u8::from(*month)),
            Self::YearMonth { year, month } => write!(f, "{year:04}-{:02}", u8::from(*month)),
        }
    }
}

/// Sum the amounts of each kind of transaction of `user_id` within `period`.
///
/// The month of a transaction is taken from its timestamp as recorded, in the
/// timestamp's own UTC offset.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if a total does not fit in 64 bits of cents,
/// - or [Error::StorageUnavailable] if there is an SQL error.
pub fn monthly_report(
    user_id: UserID,
    period: ReportPeriod,
    scope: ReportScope,
    current_year: i32,
    connection: &Connection,
) -> Result<MonthlyReport, Error> {
    let transactions = query_transactions_by_user(
        user_id,
        |transaction| period.contains(transaction.timestamp, scope, current_year),
        connection,
    )?;

    let mut report = MonthlyReport::new();
    for transaction in &transactions {
        let total = report.entry(transaction.kind).or_insert(Money::ZERO);
        *total = total
            .checked_add(transaction.amount)
            .ok_or(Error::InvalidAmount)?;
    }

    tracing::debug!(
        "Monthly report for user {user_id}, period {period} ({scope}): {} transactions",
        transactions.len()
    );

    Ok(report)
}


#[cfg(test)]
mod report_tests {
    use rusqlite::Connection;
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        CategoryName, Error, Money, MonthlyReport, ReportPeriod, ReportScope, Transaction,
        TransactionKind, UserID,
        db::initialize,
        transaction::{insert_transaction, record_transaction},
    };

    use super::monthly_report;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn record(
        user: i64,
        kind: TransactionKind,
        units: i64,
        timestamp: OffsetDateTime,
        conn: &mut Connection,
    ) {
        record_transaction(
            Transaction::build(
                UserID::new(user),
                kind,
                CategoryName::new_unchecked("misc"),
                Money::from_units(units),
            )
            .timestamp(timestamp),
            conn,
        )
        .expect("Could not record transaction");
    }

    fn may_report(conn: &Connection) -> MonthlyReport {
        monthly_report(
            UserID::new(1),
            ReportPeriod::parse("05").unwrap(),
            ReportScope::MonthOnly,
            2025,
            conn,
        )
        .unwrap()
    }

    #[test]
    fn sums_each_kind_in_month() {
        let mut conn = get_test_connection();
        record(1, TransactionKind::Income, 1000, datetime!(2025-05-01 8:00 UTC), &mut conn);
        record(1, TransactionKind::Expense, 200, datetime!(2025-05-20 8:00 UTC), &mut conn);

        let report = may_report(&conn);

        assert_eq!(
            report,
            MonthlyReport::from([
                (TransactionKind::Income, Money::from_units(1000)),
                (TransactionKind::Expense, Money::from_units(200)),
            ])
        );
    }

    #[test]
    fn other_months_and_users_are_excluded() {
        let mut conn = get_test_connection();
        record(1, TransactionKind::Income, 1000, datetime!(2025-05-01 8:00 UTC), &mut conn);
        record(1, TransactionKind::Expense, 200, datetime!(2025-05-20 8:00 UTC), &mut conn);
        let before = may_report(&conn);

        record(1, TransactionKind::Expense, 75, datetime!(2025-06-01 8:00 UTC), &mut conn);
        record(2, TransactionKind::Expense, 75, datetime!(2025-05-02 8:00 UTC), &mut conn);

        assert_eq!(may_report(&conn), before);
    }

    #[test]
    fn month_only_scope_includes_other_years() {
        let mut conn = get_test_connection();
        record(1, TransactionKind::Expense, 10, datetime!(2023-05-01 8:00 UTC), &mut conn);
        record(1, TransactionKind::Expense, 20, datetime!(2025-05-01 8:00 UTC), &mut conn);

        let report = may_report(&conn);

        assert_eq!(report.get(&TransactionKind::Expense), Some(&Money::from_units(30)));
    }

    #[test]
    fn year_and_month_scope_excludes_other_years() {
        let mut conn = get_test_connection();
        record(1, TransactionKind::Expense, 10, datetime!(2023-05-01 8:00 UTC), &mut conn);
        record(1, TransactionKind::Expense, 20, datetime!(2025-05-01 8:00 UTC), &mut conn);

        let report = monthly_report(
            UserID::new(1),
            ReportPeriod::parse("05").unwrap(),
            ReportScope::YearAndMonth,
            2025,
            &conn,
        )
        .unwrap();

        assert_eq!(report.get(&TransactionKind::Expense), Some(&Money::from_units(20)));
    }

    #[test]
    fn month_uses_recorded_offset() {
        let mut conn = get_test_connection();
        // 2025-06-01 03:30 in UTC, but still May where it was recorded.
        record(1, TransactionKind::Expense, 10, datetime!(2025-05-31 23:30 -4), &mut conn);

        let report = may_report(&conn);

        assert_eq!(report.get(&TransactionKind::Expense), Some(&Money::from_units(10)));
    }

    #[test]
    fn overflowing_total_is_an_error() {
        let conn = get_test_connection();
        for _ in 0..2 {
            insert_transaction(
                &Transaction::build(
                    UserID::new(1),
                    TransactionKind::Expense,
                    CategoryName::new_unchecked("misc"),
                    Money::from_cents(i64::MAX / 2 + 1),
                )
                .timestamp(datetime!(2025-05-01 8:00 UTC)),
                &conn,
            )
            .unwrap();
        }

        let result = monthly_report(
            UserID::new(1),
            ReportPeriod::parse("05").unwrap(),
            ReportScope::MonthOnly,
            2025,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidAmount));
    }

    #[test]
    fn empty_report_when_nothing_matches() {
        let conn = get_test_connection();

        assert!(may_report(&conn).is_empty());
    }
}
