use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::Connection;

use crate::accounts::has_account_access;
use crate::dates::{day_end_ts, day_start_ts};
use crate::error::{Result, TallyError};

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Period-over-period change. A zero/absent previous value yields exactly
/// 100 instead of dividing by zero.
fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        100.0
    } else {
        round2(100.0 * (current - previous) / previous)
    }
}

// ---------------------------------------------------------------------------
// Bulk delta recalculation (invoked inside the import confirm transaction)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Delta {
    pub amount: f64,
    pub is_income: bool,
}

/// Fold a batch of transaction deltas into an account's analytics row. The
/// current cumulative values become the previous-period baselines and the
/// change fields are recomputed against them. The row must already exist,
/// this never creates one, and the caller is expected to hold an open
/// store transaction.
pub fn apply_bulk_deltas(
    conn: &Connection,
    account_id: i64,
    owner_id: i64,
    deltas: &[Delta],
) -> Result<()> {
    let (income, expense, balance): (f64, f64, f64) = conn
        .query_row(
            "SELECT income, expense, balance FROM analytics WHERE account_id = ?1 AND owner_id = ?2",
            rusqlite::params![account_id, owner_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                TallyError::NotFound(format!("analytics row for account {account_id}"))
            }
            e => TallyError::Db(e),
        })?;

    let mut income_delta = 0.0;
    let mut expense_delta = 0.0;
    for d in deltas {
        if d.is_income {
            income_delta += d.amount;
        } else {
            expense_delta += d.amount;
        }
    }

    let new_income = income + income_delta;
    let new_expense = expense + expense_delta;
    let new_balance = balance + income_delta - expense_delta;

    conn.execute(
        "UPDATE analytics SET \
         previous_income = ?1, previous_expense = ?2, previous_balance = ?3, \
         income = ?4, expense = ?5, balance = ?6, \
         income_pct_change = ?7, expense_pct_change = ?8, balance_pct_change = ?9 \
         WHERE account_id = ?10 AND owner_id = ?11",
        rusqlite::params![
            income,
            expense,
            balance,
            new_income,
            new_expense,
            new_balance,
            pct_change(new_income, income),
            pct_change(new_expense, expense),
            pct_change(new_balance, balance),
            account_id,
            owner_id
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AccountTxnCount {
    pub account_id: i64,
    pub name: String,
    pub transactions: i64,
}

#[derive(Debug, Default, PartialEq)]
pub struct ExtremeValues {
    pub max_expense: f64,
    pub min_expense: f64,
    pub max_income: f64,
    pub min_income: f64,
}

#[derive(Debug)]
pub struct DailyPoint {
    pub date: String,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Default)]
pub struct OwnerTotals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub income_pct_change: f64,
    pub expense_pct_change: f64,
    pub balance_pct_change: f64,
}

#[derive(Debug, Default)]
pub struct DashboardSummary {
    pub accounts: Vec<AccountTxnCount>,
    pub total_transactions: i64,
    pub extremes: ExtremeValues,
    pub daily: Vec<DailyPoint>,
    pub totals: OwnerTotals,
}

pub fn dashboard(conn: &Connection, owner_id: i64) -> Result<DashboardSummary> {
    // A lone account with nothing recorded short-circuits to an all-zero
    // summary before any of the heavier aggregate queries run.
    let seed: Vec<(f64, f64)> = conn
        .prepare("SELECT income, expense FROM analytics WHERE owner_id = ?1")?
        .query_map([owner_id], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if seed.len() == 1 && seed[0] == (0.0, 0.0) {
        return Ok(DashboardSummary::default());
    }

    let mut stmt = conn.prepare(
        "SELECT a.id, a.name, COUNT(t.id) FROM accounts a \
         LEFT JOIN transactions t ON t.account_id = a.id \
         WHERE a.owner_id = ?1 GROUP BY a.id ORDER BY a.name",
    )?;
    let accounts: Vec<AccountTxnCount> = stmt
        .query_map([owner_id], |row| {
            Ok(AccountTxnCount {
                account_id: row.get(0)?,
                name: row.get(1)?,
                transactions: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total_transactions: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE owner_id = ?1",
        [owner_id],
        |r| r.get(0),
    )?;

    let extremes = conn.query_row(
        "SELECT \
         COALESCE(MAX(CASE WHEN is_income = 0 THEN amount END), 0), \
         COALESCE(MIN(CASE WHEN is_income = 0 THEN amount END), 0), \
         COALESCE(MAX(CASE WHEN is_income = 1 THEN amount END), 0), \
         COALESCE(MIN(CASE WHEN is_income = 1 THEN amount END), 0) \
         FROM transactions WHERE owner_id = ?1",
        [owner_id],
        |r| {
            Ok(ExtremeValues {
                max_expense: r.get(0)?,
                min_expense: r.get(1)?,
                max_income: r.get(2)?,
                min_income: r.get(3)?,
            })
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT substr(created_at, 1, 10) AS day, \
         SUM(CASE WHEN is_income = 1 THEN amount ELSE 0 END), \
         SUM(CASE WHEN is_income = 0 THEN amount ELSE 0 END) \
         FROM transactions WHERE owner_id = ?1 \
         GROUP BY day ORDER BY day ASC",
    )?;
    let daily: Vec<DailyPoint> = stmt
        .query_map([owner_id], |row| {
            let income: f64 = row.get(1)?;
            let expense: f64 = row.get(2)?;
            Ok(DailyPoint {
                date: row.get(0)?,
                income,
                expense,
                balance: income - expense,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Sums of the cumulative counters, but *averages* of the per-account
    // percentage-change fields.
    let totals = conn.query_row(
        "SELECT COALESCE(SUM(income), 0), COALESCE(SUM(expense), 0), COALESCE(SUM(balance), 0), \
         COALESCE(AVG(income_pct_change), 0), COALESCE(AVG(expense_pct_change), 0), \
         COALESCE(AVG(balance_pct_change), 0) \
         FROM analytics WHERE owner_id = ?1",
        [owner_id],
        |r| {
            Ok(OwnerTotals {
                income: r.get(0)?,
                expense: r.get(1)?,
                balance: r.get(2)?,
                income_pct_change: round2(r.get(3)?),
                expense_pct_change: round2(r.get(4)?),
                balance_pct_change: round2(r.get(5)?),
            })
        },
    )?;

    Ok(DashboardSummary {
        accounts,
        total_transactions,
        extremes,
        daily,
        totals,
    })
}

// ---------------------------------------------------------------------------
// Windowed period comparison
// ---------------------------------------------------------------------------

/// A duration descriptor resolving to a concrete date window. The
/// comparison window is always the same-length span immediately before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Window {
    /// Last N days, ending today.
    Days(i64),
    /// Current calendar month to date.
    ThisMonth,
    /// The whole previous calendar month.
    LastMonth,
    /// Current calendar year to date.
    ThisYear,
    Custom { start: NaiveDate, end: NaiveDate },
}

/// Upper bound for `Nd` descriptors, 100 years. Keeps the resolved span
/// well inside what date arithmetic can represent.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

impl Window {
    /// Parse a descriptor: `7d`, `month`, `last-month`, `year`, or
    /// `YYYY-MM-DD..YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Some((a, b)) = raw.split_once("..") {
            let start = NaiveDate::parse_from_str(a, "%Y-%m-%d")
                .map_err(|_| TallyError::BadRequest(format!("invalid start date '{a}'")))?;
            let end = NaiveDate::parse_from_str(b, "%Y-%m-%d")
                .map_err(|_| TallyError::BadRequest(format!("invalid end date '{b}'")))?;
            if start > end {
                return Err(TallyError::BadRequest("start date is after end date".to_string()));
            }
            return Ok(Window::Custom { start, end });
        }
        match raw {
            "month" => Ok(Window::ThisMonth),
            "last-month" => Ok(Window::LastMonth),
            "year" => Ok(Window::ThisYear),
            _ => {
                let days = raw
                    .strip_suffix('d')
                    .and_then(|n| n.parse::<i64>().ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        TallyError::BadRequest(format!("unrecognized duration '{raw}'"))
                    })?;
                if days > MAX_WINDOW_DAYS {
                    return Err(TallyError::BadRequest(format!(
                        "duration must be at most {MAX_WINDOW_DAYS} days, got {days}"
                    )));
                }
                Ok(Window::Days(days))
            }
        }
    }

    /// Resolve to an inclusive `[start, end]` date pair.
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            Window::Days(n) => (today - Duration::days(n - 1), today),
            Window::ThisMonth => (today.with_day(1).unwrap_or(today), today),
            Window::LastMonth => {
                let first_of_this = today.with_day(1).unwrap_or(today);
                let end = first_of_this - Duration::days(1);
                (end.with_day(1).unwrap_or(end), end)
            }
            Window::ThisYear => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                today,
            ),
            Window::Custom { start, end } => (start, end),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct PeriodComparison {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub income_pct_change: f64,
    pub expense_pct_change: f64,
    pub balance_pct_change: f64,
}

fn window_totals(
    conn: &Connection,
    account_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(f64, f64)> {
    Ok(conn.query_row(
        "SELECT \
         COALESCE(SUM(CASE WHEN is_income = 1 THEN amount ELSE 0 END), 0), \
         COALESCE(SUM(CASE WHEN is_income = 0 THEN amount ELSE 0 END), 0) \
         FROM transactions WHERE account_id = ?1 AND created_at >= ?2 AND created_at <= ?3",
        rusqlite::params![account_id, day_start_ts(start), day_end_ts(end)],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?)
}

/// Windowed income/expense/balance totals with change against the
/// equal-length immediately-preceding window. The caller must own the
/// account or hold a share row for it.
pub fn custom_analytics(
    conn: &Connection,
    account_id: i64,
    user_id: i64,
    window: Window,
    today: NaiveDate,
) -> Result<PeriodComparison> {
    if !has_account_access(conn, account_id, user_id)? {
        return Err(TallyError::NotFound(format!("account {account_id}")));
    }

    let (start, end) = window.resolve(today);
    let len_days = (end - start).num_days() + 1;
    let prev_end = start - Duration::days(1);
    let prev_start = start - Duration::days(len_days);

    let (income, expense) = window_totals(conn, account_id, start, end)?;
    let (prev_income, prev_expense) = window_totals(conn, account_id, prev_start, prev_end)?;

    let balance = income - expense;
    let prev_balance = prev_income - prev_expense;

    if income == 0.0 && expense == 0.0 && prev_income == 0.0 && prev_expense == 0.0 {
        return Ok(PeriodComparison::default());
    }

    Ok(PeriodComparison {
        income,
        expense,
        balance,
        income_pct_change: pct_change(income, prev_income),
        expense_pct_change: pct_change(expense, prev_expense),
        balance_pct_change: pct_change(balance, prev_balance),
    })
}
