//! The ledger service that ties the transaction recorder, budget accountant
//! and report aggregator to one database.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    BudgetStatus, CategoryName, Error, LedgerConfig, Money, MonthlyReport, ReportPeriod,
    Transaction, TransactionId, TransactionKind, UserID, budget, db, report::monthly_report,
    transaction,
};

/// Records transactions and keeps budgets for any number of users.
///
/// A `Ledger` is cheap to clone and every clone shares the same database
/// connection, so it can be handed to as many threads as needed. Writes that
/// touch a budget are serialized per database, so concurrent expenses never
/// overwrite each other's spending.
#[derive(Debug, Clone)]
pub struct Ledger {
    connection: Arc<Mutex<Connection>>,
    config: LedgerConfig,
}

impl Ledger {
    /// Create a ledger from an open `connection`.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection, config: LedgerConfig) -> Result<Self, Error> {
        db::initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            config,
        })
    }

    /// Open the ledger database at [LedgerConfig::db_path], creating it if needed.
    ///
    /// # Errors
    /// Returns [Error::StorageUnavailable] if the database cannot be opened or initialized.
    pub fn open(config: LedgerConfig) -> Result<Self, Error> {
        let connection = db::open(&config.db_path, config.busy_timeout())?;
        tracing::info!("Opened ledger at {:?}", config.db_path);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            config,
        })
    }

    /// The configuration the ledger was created with.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("Could not acquire database lock: {error}");
            Error::StorageUnavailable("could not acquire the database lock".to_owned())
        })
    }

    /// Record an income or expense and return its ID.
    ///
    /// An expense counts towards the budget of its category, if one has been set.
    ///
    /// `kind` is already typed, so [Error::InvalidKind] is raised where kinds are
    /// parsed from text, see [TransactionKind]'s `FromStr` implementation.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidAmount] if `amount` is zero, negative or above [Money::MAX_AMOUNT],
    /// - [Error::InvalidCategory] if `category` is empty,
    /// - or [Error::StorageUnavailable] if the write failed, in which case nothing was written.
    pub fn record(
        &self,
        user_id: UserID,
        kind: TransactionKind,
        category: &str,
        amount: Money,
        timestamp: OffsetDateTime,
    ) -> Result<TransactionId, Error> {
        let category = CategoryName::new(category)?;
        let new_transaction = Transaction::build(user_id, kind, category, amount).timestamp(timestamp);

        let mut connection = self.lock()?;
        let transaction = transaction::record_transaction(new_transaction, &mut connection)?;

        Ok(transaction.id)
    }

    /// Set the spending limit for a category, creating the budget if needed.
    ///
    /// A new budget includes expenses recorded before it when
    /// [LedgerConfig::backfill_on_create] is set. An existing budget keeps
    /// its spending and only has its limit replaced.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidAmount] if `budget_amount` is negative or above [Money::MAX_AMOUNT],
    /// - [Error::InvalidCategory] if `category` is empty,
    /// - or [Error::StorageUnavailable] if the write failed, in which case nothing was written.
    pub fn set_budget(
        &self,
        user_id: UserID,
        category: &str,
        budget_amount: Money,
    ) -> Result<(), Error> {
        let category = CategoryName::new(category)?;

        let mut connection = self.lock()?;
        budget::set_budget(
            user_id,
            &category,
            budget_amount,
            self.config.backfill_on_create,
            &mut connection,
        )?;

        Ok(())
    }

    /// Compare the budget for a category against what has been spent.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidCategory] if `category` is empty,
    /// - [Error::NotFound] if no budget has been set for `category`,
    /// - or [Error::StorageUnavailable] if the database could not be read.
    pub fn check_budget(&self, user_id: UserID, category: &str) -> Result<BudgetStatus, Error> {
        let category = CategoryName::new(category)?;
        let connection = self.lock()?;

        budget::check_budget(user_id, &category, &connection)
    }

    /// The status of every budget of a user, sorted by category name.
    ///
    /// # Errors
    /// Returns [Error::StorageUnavailable] if the database could not be read.
    pub fn list_budgets(&self, user_id: UserID) -> Result<Vec<BudgetStatus>, Error> {
        let connection = self.lock()?;

        budget::list_budgets(user_id, &connection)
    }

    /// Total income and expenses of a user for a month.
    ///
    /// `month` is either "MM", or "YYYY-MM". How the year is treated depends on
    /// [LedgerConfig::report_scope].
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidPeriod] if `month` cannot be parsed,
    /// - [Error::InvalidAmount] if a total does not fit in 64 bits of cents,
    /// - or [Error::StorageUnavailable] if the database could not be read.
    pub fn monthly_report(&self, user_id: UserID, month: &str) -> Result<MonthlyReport, Error> {
        let period = ReportPeriod::parse(month)?;
        let current_year = OffsetDateTime::now_utc().year();
        let connection = self.lock()?;

        monthly_report(
            user_id,
            period,
            self.config.report_scope,
            current_year,
            &connection,
        )
    }

    /// All transactions of a user in the order they were recorded.
    ///
    /// # Errors
    /// Returns [Error::StorageUnavailable] if the database could not be read.
    pub fn transactions(&self, user_id: UserID) -> Result<Vec<Transaction>, Error> {
        let connection = self.lock()?;

        transaction::query_transactions_by_user(user_id, |_| true, &connection)
    }

    /// The number of transactions recorded across all users.
    ///
    /// # Errors
    /// Returns [Error::StorageUnavailable] if the database could not be read.
    pub fn count_transactions(&self) -> Result<usize, Error> {
        let connection = self.lock()?;

        transaction::count_transactions(&connection)
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        Error, Ledger, LedgerConfig, Money, MonthlyReport, ReportScope, TransactionKind, UserID,
    };

    fn get_test_ledger(config: LedgerConfig) -> Ledger {
        Ledger::new(Connection::open_in_memory().unwrap(), config).unwrap()
    }

    const USER: UserID = UserID::new(1);

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    #[test]
    fn record_returns_increasing_ids() {
        let ledger = get_test_ledger(LedgerConfig::default());

        let first = ledger
            .record(USER, TransactionKind::Income, "salary", Money::from_units(10), now())
            .unwrap();
        let second = ledger
            .record(USER, TransactionKind::Expense, "food", Money::from_units(1), now())
            .unwrap();

        assert!(second > first);
        assert_eq!(ledger.count_transactions(), Ok(2));
    }

    #[test]
    fn record_rejects_invalid_input_without_writing() {
        let ledger = get_test_ledger(LedgerConfig::default());
        ledger.set_budget(USER, "food", Money::from_units(100)).unwrap();

        let zero = ledger.record(USER, TransactionKind::Expense, "food", Money::ZERO, now());
        let negative =
            ledger.record(USER, TransactionKind::Expense, "food", Money::from_units(-5), now());
        let empty = ledger.record(USER, TransactionKind::Expense, " ", Money::from_units(5), now());

        assert_eq!(zero, Err(Error::InvalidAmount));
        assert_eq!(negative, Err(Error::InvalidAmount));
        assert_eq!(empty, Err(Error::InvalidCategory));
        assert_eq!(ledger.count_transactions(), Ok(0));
        assert_eq!(
            ledger.check_budget(USER, "food").unwrap().spent_amount,
            Money::ZERO
        );
    }

    #[test]
    fn backfill_scenario() {
        let ledger = get_test_ledger(LedgerConfig::default());
        ledger
            .record(USER, TransactionKind::Expense, "food", Money::from_units(50), now())
            .unwrap();

        ledger.set_budget(USER, "food", Money::from_units(100)).unwrap();

        let status = ledger.check_budget(USER, "food").unwrap();
        assert_eq!(status.spent_amount, Money::from_units(50));
        assert_eq!(status.remaining, Money::from_units(50));
        assert!(!status.exceeded);
    }

    #[test]
    fn no_backfill_when_disabled() {
        let ledger = get_test_ledger(LedgerConfig {
            backfill_on_create: false,
            ..LedgerConfig::default()
        });
        ledger
            .record(USER, TransactionKind::Expense, "food", Money::from_units(50), now())
            .unwrap();

        ledger.set_budget(USER, "food", Money::from_units(100)).unwrap();

        let status = ledger.check_budget(USER, "food").unwrap();
        assert_eq!(status.spent_amount, Money::ZERO);
        assert_eq!(status.remaining, Money::from_units(100));
    }

    #[test]
    fn exceeded_scenario() {
        let ledger = get_test_ledger(LedgerConfig::default());
        ledger.set_budget(USER, "food", Money::from_units(100)).unwrap();

        for _ in 0..2 {
            ledger
                .record(USER, TransactionKind::Expense, "food", Money::from_units(60), now())
                .unwrap();
        }

        let status = ledger.check_budget(USER, "food").unwrap();
        assert_eq!(status.spent_amount, Money::from_units(120));
        assert_eq!(status.remaining, Money::from_units(-20));
        assert!(status.exceeded);
    }

    #[test]
    fn set_budget_twice_preserves_spent() {
        let ledger = get_test_ledger(LedgerConfig::default());
        ledger.set_budget(USER, "food", Money::from_units(100)).unwrap();
        ledger
            .record(USER, TransactionKind::Expense, "food", Money::from_units(30), now())
            .unwrap();

        ledger.set_budget(USER, "food", Money::from_units(40)).unwrap();

        let status = ledger.check_budget(USER, "food").unwrap();
        assert_eq!(status.budget_amount, Money::from_units(40));
        assert_eq!(status.spent_amount, Money::from_units(30));
    }

    #[test]
    fn set_budget_rejects_negative_amount() {
        let ledger = get_test_ledger(LedgerConfig::default());

        assert_eq!(
            ledger.set_budget(USER, "food", Money::from_cents(-1)),
            Err(Error::InvalidAmount)
        );
        assert_eq!(ledger.check_budget(USER, "food"), Err(Error::NotFound));
    }

    #[test]
    fn check_budget_on_missing_category_is_not_found() {
        let ledger = get_test_ledger(LedgerConfig::default());

        assert_eq!(ledger.check_budget(USER, "food"), Err(Error::NotFound));
    }

    #[test]
    fn budgets_are_scoped_per_user() {
        let ledger = get_test_ledger(LedgerConfig::default());
        let other = UserID::new(2);
        ledger.set_budget(USER, "food", Money::from_units(100)).unwrap();
        ledger.set_budget(other, "food", Money::from_units(10)).unwrap();

        ledger
            .record(other, TransactionKind::Expense, "food", Money::from_units(7), now())
            .unwrap();

        assert_eq!(ledger.check_budget(USER, "food").unwrap().spent_amount, Money::ZERO);
        assert_eq!(
            ledger.check_budget(other, "food").unwrap().spent_amount,
            Money::from_units(7)
        );
        assert_eq!(ledger.list_budgets(USER).unwrap().len(), 1);
    }

    #[test]
    fn list_budgets_is_sorted() {
        let ledger = get_test_ledger(LedgerConfig::default());
        ledger.set_budget(USER, "rent", Money::from_units(1)).unwrap();
        ledger.set_budget(USER, "food", Money::from_units(1)).unwrap();

        let budgets = ledger.list_budgets(USER).unwrap();

        let categories: Vec<&str> = budgets.iter().map(|b| b.category.as_ref()).collect();
        assert_eq!(categories, ["food", "rent"]);
    }

    #[test]
    fn monthly_report_scenario() {
        let ledger = get_test_ledger(LedgerConfig::default());
        ledger
            .record(
                USER,
                TransactionKind::Income,
                "salary",
                Money::from_units(1000),
                datetime!(2025-05-02 9:00 UTC),
            )
            .unwrap();
        ledger
            .record(
                USER,
                TransactionKind::Expense,
                "food",
                Money::from_units(200),
                datetime!(2025-05-15 18:00 UTC),
            )
            .unwrap();
        let want = MonthlyReport::from([
            (TransactionKind::Income, Money::from_units(1000)),
            (TransactionKind::Expense, Money::from_units(200)),
        ]);

        assert_eq!(ledger.monthly_report(USER, "05"), Ok(want.clone()));

        ledger
            .record(
                USER,
                TransactionKind::Expense,
                "food",
                Money::from_units(99),
                datetime!(2025-06-01 9:00 UTC),
            )
            .unwrap();

        assert_eq!(ledger.monthly_report(USER, "05"), Ok(want));
    }

    #[test]
    fn monthly_report_with_year_scope_uses_current_year() {
        let ledger = get_test_ledger(LedgerConfig {
            report_scope: ReportScope::YearAndMonth,
            ..LedgerConfig::default()
        });
        let this_month = now();
        let last_year = this_month.replace_year(this_month.year() - 1).unwrap();
        ledger
            .record(USER, TransactionKind::Expense, "food", Money::from_units(3), this_month)
            .unwrap();
        ledger
            .record(USER, TransactionKind::Expense, "food", Money::from_units(4), last_year)
            .unwrap();
        let month = format!("{:02}", u8::from(this_month.month()));

        let report = ledger.monthly_report(USER, &month).unwrap();

        assert_eq!(
            report.get(&TransactionKind::Expense),
            Some(&Money::from_units(3))
        );
    }

    #[test]
    fn monthly_report_rejects_bad_period() {
        let ledger = get_test_ledger(LedgerConfig::default());

        assert_eq!(
            ledger.monthly_report(USER, "May"),
            Err(Error::InvalidPeriod("May".to_owned()))
        );
    }

    #[test]
    fn transactions_lists_only_the_users_transactions_in_order() {
        let ledger = get_test_ledger(LedgerConfig::default());
        let first = ledger
            .record(USER, TransactionKind::Income, "salary", Money::from_units(1), now())
            .unwrap();
        ledger
            .record(UserID::new(2), TransactionKind::Income, "salary", Money::from_units(1), now())
            .unwrap();
        let third = ledger
            .record(USER, TransactionKind::Expense, "food", Money::from_units(1), now())
            .unwrap();

        let ids: Vec<_> = ledger
            .transactions(USER)
            .unwrap()
            .into_iter()
            .map(|transaction| transaction.id)
            .collect();

        assert_eq!(ids, [first, third]);
    }
}
