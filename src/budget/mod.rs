//! Per-category budgets and the spending counted against them.

mod accountant;
mod core;

pub use accountant::{apply_expense, check_budget, list_budgets, set_budget};
pub use core::{
    BudgetEntry, BudgetStatus, create_budget_table, get_budget_entries, get_budget_entry,
    increment_spent, insert_budget_entry, update_budget_amount,
};
