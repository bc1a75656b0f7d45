use crate::analytics::{custom_analytics, Window};
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{amount, pct};
use crate::settings::db_path;

pub fn run(user: i64, account: i64, window: &str) -> Result<()> {
    let window = Window::parse(window)?;
    let conn = get_connection(&db_path())?;
    let today = chrono::Local::now().date_naive();
    let (start, end) = window.resolve(today);
    let report = custom_analytics(&conn, account, user, window, today)?;

    println!("Account #{account}, {start} to {end} (vs. the preceding period)");
    println!("Income:   {} ({})", amount(report.income), pct(report.income_pct_change));
    println!("Expense:  {} ({})", amount(report.expense), pct(report.expense_pct_change));
    println!("Balance:  {} ({})", amount(report.balance), pct(report.balance_pct_change));
    Ok(())
}
