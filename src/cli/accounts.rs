use comfy_table::{Cell, Table};

use crate::accounts::{create_account, delete_account, list_accounts, update_account, AccountChanges};
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{money, pct};
use crate::settings::db_path;

pub fn add(user: i64, name: &str, balance: f64, currency: &str) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    let account = create_account(&mut conn, user, name, balance, currency)?;
    println!(
        "Added account {} (#{}) with opening balance {}",
        account.name,
        account.id,
        money(account.balance, &account.currency)
    );
    Ok(())
}

pub fn list(user: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let accounts = list_accounts(&conn, user)?;
    if accounts.is_empty() {
        println!("No accounts yet. Add one with `tally accounts add`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Balance", "Income", "Expense", "Change"]);
    for account in accounts {
        let (income, expense, balance, balance_pct): (f64, f64, f64, f64) = conn.query_row(
            "SELECT income, expense, balance, balance_pct_change FROM analytics \
             WHERE account_id = ?1",
            [account.id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?;
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(&account.name),
            Cell::new(money(balance, &account.currency)),
            Cell::new(money(income, &account.currency)),
            Cell::new(money(expense, &account.currency)),
            Cell::new(pct(balance_pct)),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn update(
    user: i64,
    id: i64,
    name: Option<String>,
    balance: Option<f64>,
    currency: Option<String>,
) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    let changes = AccountChanges { name, balance, currency };
    if update_account(&mut conn, id, user, changes)? {
        println!("Updated account #{id}");
    } else {
        println!("Nothing to update for account #{id}");
    }
    Ok(())
}

pub fn delete(user: i64, id: i64) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    delete_account(&mut conn, id, user)?;
    println!("Deleted account #{id} and its transactions, analytics, and imports");
    Ok(())
}
