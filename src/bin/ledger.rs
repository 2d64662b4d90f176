use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use serde::Serialize;
use time::{
    Date, OffsetDateTime, Time, format_description::well_known::Rfc3339, macros::format_description,
};

use ledger_rs::{
    FixedIdentity, IdentityProvider, Ledger, LedgerConfig, Money, ReportScope, TransactionKind,
    UserID, init_logging,
};

/// Record income and expenses and keep track of budgets.
///
/// Results are printed as JSON, with amounts in cents.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long, env = "LEDGER_DB_PATH", default_value = LedgerConfig::DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// The ID of the user to act as.
    #[arg(short, long, env = "LEDGER_USER")]
    user: i64,

    /// How monthly reports treat the year: "month-only" or "year-and-month".
    #[arg(long, env = "LEDGER_REPORT_SCOPE", default_value_t = ReportScope::MonthOnly)]
    report_scope: ReportScope,

    /// Start new budgets at zero instead of counting earlier expenses.
    #[arg(long)]
    no_backfill: bool,

    /// How long to wait for other writers, in milliseconds.
    #[arg(long, default_value_t = LedgerConfig::DEFAULT_BUSY_TIMEOUT_MS)]
    busy_timeout_ms: u64,

    /// The log level for messages printed to stderr.
    #[arg(long, env = "LEDGER_LOG", default_value = "warn")]
    log_level: String,

    /// Also write debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an income or an expense.
    Record {
        /// "income" or "expense".
        kind: TransactionKind,
        /// The category, e.g. "food".
        category: String,
        /// The amount, e.g. "12.50".
        #[arg(allow_hyphen_values = true)]
        amount: Money,
        /// When it happened, as "YYYY-MM-DD" or an RFC 3339 timestamp. Defaults to now.
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<OffsetDateTime>,
    },
    /// Set or replace the budget for a category.
    SetBudget {
        /// The category, e.g. "food".
        category: String,
        /// The spending limit, e.g. "300".
        #[arg(allow_hyphen_values = true)]
        amount: Money,
    },
    /// Show how much of a budget has been spent.
    CheckBudget {
        /// The category, e.g. "food".
        category: String,
    },
    /// Show every budget.
    ListBudgets,
    /// Total income and expenses for a month.
    Report {
        /// "MM" or "YYYY-MM".
        month: String,
    },
    /// List every transaction.
    Transactions,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = init_logging(&args.log_level, args.log_file.as_deref()) {
        eprintln!("Could not set up logging: {error}");
        return ExitCode::FAILURE;
    }

    let config = LedgerConfig {
        db_path: args.db_path,
        busy_timeout_ms: args.busy_timeout_ms,
        report_scope: args.report_scope,
        backfill_on_create: !args.no_backfill,
    };
    let identity = FixedIdentity::new(UserID::new(args.user));

    match run(args.command, config, &identity) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    command: Command,
    config: LedgerConfig,
    identity: &impl IdentityProvider,
) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = Ledger::open(config)?;
    let user_id = identity.current_user_id();

    match command {
        Command::Record {
            kind,
            category,
            amount,
            at,
        } => {
            let timestamp = at.unwrap_or_else(OffsetDateTime::now_utc);
            let id = ledger.record(user_id, kind, &category, amount, timestamp)?;
            print_json(&serde_json::json!({ "id": id }))
        }
        Command::SetBudget { category, amount } => {
            ledger.set_budget(user_id, &category, amount)?;
            print_json(&ledger.check_budget(user_id, &category)?)
        }
        Command::CheckBudget { category } => print_json(&ledger.check_budget(user_id, &category)?),
        Command::ListBudgets => print_json(&ledger.list_budgets(user_id)?),
        Command::Report { month } => print_json(&ledger.monthly_report(user_id, &month)?),
        Command::Transactions => print_json(&ledger.transactions(user_id)?),
    }
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}

fn parse_timestamp(text: &str) -> Result<OffsetDateTime, String> {
    if let Ok(timestamp) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(timestamp);
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
        .map_err(|error| format!("could not parse \"{text}\" as a date or timestamp: {error}"))
}
