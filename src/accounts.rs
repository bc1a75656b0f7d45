use rusqlite::Connection;

use crate::dates::now_ts;
use crate::error::{constraint_as_conflict, Result, TallyError};
use crate::models::Account;

pub const OPENING_BALANCE_CATEGORY: &str = "Opening Balance";

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Currency codes are stored upper-case, exactly 3 letters.
fn validate_currency(raw: &str) -> Result<String> {
    let code = raw.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(TallyError::BadRequest(format!(
            "currency must be a 3-letter code, got '{raw}'"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TallyError::BadRequest("account name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

// ---------------------------------------------------------------------------
// Lookups shared across components
// ---------------------------------------------------------------------------

pub fn get_account(conn: &Connection, account_id: i64) -> Result<Option<Account>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, owner_id, name, balance, currency FROM accounts WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map([account_id], |row| {
        Ok(Account {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            balance: row.get(3)?,
            currency: row.get(4)?,
        })
    })?;
    Ok(rows.next().transpose()?)
}

pub fn list_accounts(conn: &Connection, owner_id: i64) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, balance, currency FROM accounts WHERE owner_id = ?1 ORDER BY name",
    )?;
    let rows = stmt.query_map([owner_id], |row| {
        Ok(Account {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            balance: row.get(3)?,
            currency: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// True when `user_id` owns the account or holds a share row for it.
pub fn has_account_access(conn: &Connection, account_id: i64, user_id: i64) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM accounts a \
         LEFT JOIN user_accounts ua ON ua.account_id = a.id AND ua.user_id = ?2 \
         WHERE a.id = ?1 AND (a.owner_id = ?2 OR ua.id IS NOT NULL)",
    )?;
    Ok(stmt.exists(rusqlite::params![account_id, user_id])?)
}

/// Look up a category by name within an owner's scope, creating it on first
/// use. Safe to call inside an enclosing transaction.
pub fn find_or_create_category(conn: &Connection, owner_id: i64, name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE owner_id = ?1 AND name = ?2",
            rusqlite::params![owner_id, name],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            e => Err(e),
        })?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO categories (owner_id, name) VALUES (?1, ?2)",
        rusqlite::params![owner_id, name],
    )
    .map_err(|e| constraint_as_conflict(e, &format!("category '{name}' already exists")))?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Create an account with its 1:1 analytics row, the per-owner "Opening
/// Balance" category, and (for a non-zero opening balance) the synthetic
/// opening transaction. All four inserts commit or roll back together.
pub fn create_account(
    conn: &mut Connection,
    owner_id: i64,
    name: &str,
    opening_balance: f64,
    currency: &str,
) -> Result<Account> {
    let name = validate_name(name)?;
    let currency = validate_currency(currency)?;
    if !opening_balance.is_finite() {
        return Err(TallyError::BadRequest("balance must be a finite number".to_string()));
    }

    let exists: bool = conn
        .prepare_cached("SELECT 1 FROM accounts WHERE owner_id = ?1 AND name = ?2")?
        .exists(rusqlite::params![owner_id, name])?;
    if exists {
        return Err(TallyError::Conflict(format!("account '{name}' already exists")));
    }

    let ts = now_ts();
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO accounts (owner_id, name, balance, currency, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        rusqlite::params![owner_id, name, opening_balance, currency, ts],
    )
    .map_err(|e| constraint_as_conflict(e, &format!("account '{name}' already exists")))?;
    let account_id = tx.last_insert_rowid();

    // Seed the aggregate cache from the opening balance. There is no
    // previous period yet, so the change fields are 100 or 0 by sign.
    let income = opening_balance.max(0.0);
    let expense = (-opening_balance).max(0.0);
    let income_pct = if opening_balance > 0.0 { 100.0 } else { 0.0 };
    let expense_pct = if opening_balance < 0.0 { 100.0 } else { 0.0 };
    let balance_pct = if opening_balance != 0.0 { 100.0 } else { 0.0 };
    tx.execute(
        "INSERT INTO analytics (account_id, owner_id, income, expense, balance, \
         income_pct_change, expense_pct_change, balance_pct_change) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            account_id,
            owner_id,
            income,
            expense,
            opening_balance,
            income_pct,
            expense_pct,
            balance_pct
        ],
    )?;

    let category_id = find_or_create_category(&tx, owner_id, OPENING_BALANCE_CATEGORY)?;

    if opening_balance != 0.0 {
        tx.execute(
            "INSERT INTO transactions (account_id, owner_id, created_by, updated_by, text, \
             amount, is_income, category_id, transfer, currency, created_at) \
             VALUES (?1, ?2, ?3, ?3, ?4, ?5, ?6, ?7, 'self', ?8, ?9)",
            rusqlite::params![
                account_id,
                owner_id,
                owner_id,
                OPENING_BALANCE_CATEGORY,
                opening_balance.abs(),
                opening_balance >= 0.0,
                category_id,
                currency,
                ts
            ],
        )?;
    }

    tx.commit()?;

    Ok(Account {
        id: account_id,
        owner_id,
        name,
        balance: opening_balance,
        currency,
    })
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub balance: Option<f64>,
    pub currency: Option<String>,
}

/// Apply a partial update. Returns `Ok(false)` without touching the store
/// when no field actually changes. A balance change is a direct overwrite
/// mirrored into `analytics.balance` only; the cumulative income/expense
/// counters are left alone.
pub fn update_account(
    conn: &mut Connection,
    account_id: i64,
    owner_id: i64,
    changes: AccountChanges,
) -> Result<bool> {
    let current = get_account(conn, account_id)?
        .filter(|a| a.owner_id == owner_id)
        .ok_or_else(|| TallyError::NotFound(format!("account {account_id}")))?;

    let new_name = match changes.name {
        Some(raw) => {
            let name = validate_name(&raw)?;
            if name != current.name { Some(name) } else { None }
        }
        None => None,
    };
    let new_currency = match changes.currency {
        Some(raw) => {
            let code = validate_currency(&raw)?;
            if code != current.currency { Some(code) } else { None }
        }
        None => None,
    };
    let new_balance = match changes.balance {
        Some(b) if !b.is_finite() => {
            return Err(TallyError::BadRequest("balance must be a finite number".to_string()))
        }
        Some(b) if b != current.balance => Some(b),
        _ => None,
    };

    if new_name.is_none() && new_currency.is_none() && new_balance.is_none() {
        return Ok(false);
    }

    if let Some(name) = &new_name {
        let taken: bool = conn
            .prepare_cached("SELECT 1 FROM accounts WHERE owner_id = ?1 AND name = ?2 AND id != ?3")?
            .exists(rusqlite::params![owner_id, name, account_id])?;
        if taken {
            return Err(TallyError::Conflict(format!("account '{name}' already exists")));
        }
    }

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE accounts SET name = COALESCE(?1, name), balance = COALESCE(?2, balance), \
         currency = COALESCE(?3, currency), updated_at = ?4 WHERE id = ?5",
        rusqlite::params![new_name, new_balance, new_currency, now_ts(), account_id],
    )
    .map_err(|e| constraint_as_conflict(e, "account name already exists"))?;

    if let Some(balance) = new_balance {
        tx.execute(
            "UPDATE analytics SET balance = ?1 WHERE account_id = ?2",
            rusqlite::params![balance, account_id],
        )?;
    }
    tx.commit()?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Hard delete in dependency order: shares, transactions, analytics, debts,
/// staged imports, then the account row itself.
pub fn delete_account(conn: &mut Connection, account_id: i64, owner_id: i64) -> Result<()> {
    let owned: bool = conn
        .prepare_cached("SELECT 1 FROM accounts WHERE id = ?1 AND owner_id = ?2")?
        .exists(rusqlite::params![account_id, owner_id])?;
    if !owned {
        return Err(TallyError::NotFound(format!("account {account_id}")));
    }

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM user_accounts WHERE account_id = ?1", [account_id])?;
    tx.execute("DELETE FROM transactions WHERE account_id = ?1", [account_id])?;
    tx.execute("DELETE FROM analytics WHERE account_id = ?1", [account_id])?;
    tx.execute("DELETE FROM debts WHERE account_id = ?1", [account_id])?;
    tx.execute("DELETE FROM import_data WHERE account_id = ?1", [account_id])?;
    tx.execute("DELETE FROM accounts WHERE id = ?1", [account_id])?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn analytics_row(conn: &Connection, account_id: i64) -> (f64, f64, f64) {
        conn.query_row(
            "SELECT income, expense, balance FROM analytics WHERE account_id = ?1",
            [account_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap()
    }

    #[test]
    fn test_create_account_normalizes_currency() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", 0.0, "inr").unwrap();
        assert_eq!(acct.currency, "INR");
    }

    #[test]
    fn test_create_account_rejects_bad_currency() {
        let (_dir, mut conn) = test_db();
        assert!(create_account(&mut conn, 1, "Wallet", 0.0, "rupees").is_err());
        assert!(create_account(&mut conn, 1, "Wallet", 0.0, "U1D").is_err());
        assert!(create_account(&mut conn, 1, "Wallet", 0.0, "").is_err());
    }

    #[test]
    fn test_create_account_rejects_empty_name_and_nan() {
        let (_dir, mut conn) = test_db();
        assert!(create_account(&mut conn, 1, "  ", 0.0, "USD").is_err());
        assert!(create_account(&mut conn, 1, "Wallet", f64::NAN, "USD").is_err());
        assert!(create_account(&mut conn, 1, "Wallet", f64::INFINITY, "USD").is_err());
    }

    #[test]
    fn test_create_account_positive_opening_balance() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Checking", 500.0, "USD").unwrap();

        let (income, expense, balance) = analytics_row(&conn, acct.id);
        assert_eq!(income, 500.0);
        assert_eq!(expense, 0.0);
        assert_eq!(balance, 500.0);

        let (amount, is_income, transfer): (f64, bool, String) = conn
            .query_row(
                "SELECT amount, is_income, transfer FROM transactions WHERE account_id = ?1",
                [acct.id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(amount, 500.0);
        assert!(is_income);
        assert_eq!(transfer, "self");
    }

    #[test]
    fn test_create_account_negative_opening_balance() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", -100.0, "inr").unwrap();
        assert_eq!(acct.currency, "INR");

        let (income, expense, balance) = analytics_row(&conn, acct.id);
        assert_eq!(income, 0.0);
        assert_eq!(expense, 100.0);
        assert_eq!(balance, -100.0);

        let (amount, is_income, cat_name): (f64, bool, String) = conn
            .query_row(
                "SELECT t.amount, t.is_income, c.name FROM transactions t \
                 JOIN categories c ON t.category_id = c.id WHERE t.account_id = ?1",
                [acct.id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(amount, 100.0);
        assert!(!is_income);
        assert_eq!(cat_name, "Opening Balance");
    }

    #[test]
    fn test_create_account_zero_balance_has_no_opening_transaction() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Empty", 0.0, "USD").unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM transactions WHERE account_id = ?1", [acct.id], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(count, 0);
        let (income, expense, balance) = analytics_row(&conn, acct.id);
        assert_eq!((income, expense, balance), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_create_account_always_creates_analytics_row() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", 0.0, "USD").unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM analytics WHERE account_id = ?1", [acct.id], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_create_account_duplicate_name_conflicts() {
        let (_dir, mut conn) = test_db();
        create_account(&mut conn, 1, "Wallet", 0.0, "USD").unwrap();
        let err = create_account(&mut conn, 1, "Wallet", 0.0, "USD").unwrap_err();
        assert!(matches!(err, TallyError::Conflict(_)), "got {err}");
        // A different owner can reuse the name
        create_account(&mut conn, 2, "Wallet", 0.0, "USD").unwrap();
    }

    #[test]
    fn test_create_account_reuses_opening_balance_category() {
        let (_dir, mut conn) = test_db();
        create_account(&mut conn, 1, "A", 10.0, "USD").unwrap();
        create_account(&mut conn, 1, "B", 20.0, "USD").unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM categories WHERE owner_id = 1 AND name = 'Opening Balance'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_update_account_noop_returns_false() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", 50.0, "USD").unwrap();
        let changed = update_account(
            &mut conn,
            acct.id,
            1,
            AccountChanges {
                name: Some("Wallet".to_string()),
                balance: Some(50.0),
                currency: Some("usd".to_string()),
            },
        )
        .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_update_account_balance_overwrites_analytics_balance_only() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", 100.0, "USD").unwrap();
        let changed = update_account(
            &mut conn,
            acct.id,
            1,
            AccountChanges { balance: Some(250.0), ..Default::default() },
        )
        .unwrap();
        assert!(changed);

        let (income, expense, balance) = analytics_row(&conn, acct.id);
        assert_eq!(balance, 250.0);
        // Cumulative counters are independent of the direct overwrite
        assert_eq!(income, 100.0);
        assert_eq!(expense, 0.0);

        let stored: f64 = conn
            .query_row("SELECT balance FROM accounts WHERE id = ?1", [acct.id], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, 250.0);
    }

    #[test]
    fn test_update_account_rename_conflict() {
        let (_dir, mut conn) = test_db();
        create_account(&mut conn, 1, "Wallet", 0.0, "USD").unwrap();
        let other = create_account(&mut conn, 1, "Savings", 0.0, "USD").unwrap();
        let err = update_account(
            &mut conn,
            other.id,
            1,
            AccountChanges { name: Some("Wallet".to_string()), ..Default::default() },
        )
        .unwrap_err();
        assert!(matches!(err, TallyError::Conflict(_)));
    }

    #[test]
    fn test_update_account_requires_ownership() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", 0.0, "USD").unwrap();
        let err = update_account(
            &mut conn,
            acct.id,
            2,
            AccountChanges { balance: Some(5.0), ..Default::default() },
        )
        .unwrap_err();
        assert!(matches!(err, TallyError::NotFound(_)));
    }

    #[test]
    fn test_delete_account_removes_dependents() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", 75.0, "USD").unwrap();
        conn.execute(
            "INSERT INTO user_accounts (user_id, account_id) VALUES (2, ?1)",
            [acct.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO import_data (account_id, user_id, data) VALUES (?1, 1, '[]')",
            [acct.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO debts (account_id, owner_id, text, amount) VALUES (?1, 1, 'loan', 10.0)",
            [acct.id],
        )
        .unwrap();

        delete_account(&mut conn, acct.id, 1).unwrap();

        for table in &["accounts", "transactions", "analytics", "user_accounts", "import_data", "debts"] {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT count(*) FROM {table} WHERE {} = ?1",
                        if *table == "accounts" { "id" } else { "account_id" }),
                    [acct.id],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 0, "expected no {table} rows after delete");
        }
    }

    #[test]
    fn test_delete_account_requires_ownership() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", 0.0, "USD").unwrap();
        let err = delete_account(&mut conn, acct.id, 2).unwrap_err();
        assert!(matches!(err, TallyError::NotFound(_)));
        let err = delete_account(&mut conn, 9999, 1).unwrap_err();
        assert!(matches!(err, TallyError::NotFound(_)));
    }

    #[test]
    fn test_has_account_access_owner_and_share() {
        let (_dir, mut conn) = test_db();
        let acct = create_account(&mut conn, 1, "Wallet", 0.0, "USD").unwrap();
        assert!(has_account_access(&conn, acct.id, 1).unwrap());
        assert!(!has_account_access(&conn, acct.id, 2).unwrap());
        conn.execute(
            "INSERT INTO user_accounts (user_id, account_id) VALUES (2, ?1)",
            [acct.id],
        )
        .unwrap();
        assert!(has_account_access(&conn, acct.id, 2).unwrap());
    }
}
