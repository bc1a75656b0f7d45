use comfy_table::{Cell, Table};

use crate::analytics::dashboard;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{amount, pct};
use crate::settings::db_path;

pub fn run(user: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let summary = dashboard(&conn, user)?;

    if summary.accounts.is_empty() {
        println!("Nothing to show yet. Add an account or confirm an import first.");
        return Ok(());
    }

    let mut accounts = Table::new();
    accounts.set_header(vec!["ID", "Account", "Transactions"]);
    for a in &summary.accounts {
        accounts.add_row(vec![
            Cell::new(a.account_id),
            Cell::new(&a.name),
            Cell::new(a.transactions),
        ]);
    }
    println!("Accounts ({} transactions total)\n{accounts}", summary.total_transactions);

    println!();
    println!("Largest expense:   {}", amount(summary.extremes.max_expense));
    println!("Smallest expense:  {}", amount(summary.extremes.min_expense));
    println!("Largest income:    {}", amount(summary.extremes.max_income));
    println!("Smallest income:   {}", amount(summary.extremes.min_income));

    if !summary.daily.is_empty() {
        let mut daily = Table::new();
        daily.set_header(vec!["Date", "Income", "Expense", "Net"]);
        for point in &summary.daily {
            daily.add_row(vec![
                Cell::new(&point.date),
                Cell::new(amount(point.income)),
                Cell::new(amount(point.expense)),
                Cell::new(amount(point.balance)),
            ]);
        }
        println!();
        println!("Daily activity\n{daily}");
    }

    let t = &summary.totals;
    println!();
    println!("Total income:   {} ({})", amount(t.income), pct(t.income_pct_change));
    println!("Total expense:  {} ({})", amount(t.expense), pct(t.expense_pct_change));
    println!("Total balance:  {} ({})", amount(t.balance), pct(t.balance_pct_change));
    Ok(())
}
