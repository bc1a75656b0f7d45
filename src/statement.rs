use chrono::NaiveDate;
use rusqlite::Connection;

use crate::accounts::{get_account, has_account_access};
use crate::dates::{day_end_ts, day_start_ts, now_ts};
use crate::error::{Result, TallyError};
use crate::models::Account;

pub const MAX_COUNT_LIMIT: i64 = 10_000;

// ---------------------------------------------------------------------------
// Filter and format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementFilter {
    All,
    /// Inclusive date range; the end date covers the whole day.
    DateRange { start: NaiveDate, end: NaiveDate },
    /// Most recent N transactions.
    Count(i64),
}

impl StatementFilter {
    fn validate(&self) -> Result<()> {
        match *self {
            StatementFilter::All => Ok(()),
            StatementFilter::DateRange { start, end } => {
                if start > end {
                    Err(TallyError::BadRequest("start date is after end date".to_string()))
                } else {
                    Ok(())
                }
            }
            StatementFilter::Count(n) => {
                if (1..=MAX_COUNT_LIMIT).contains(&n) {
                    Ok(())
                } else {
                    Err(TallyError::BadRequest(format!(
                        "transaction count must be between 1 and {MAX_COUNT_LIMIT}, got {n}"
                    )))
                }
            }
        }
    }

    fn label(&self) -> String {
        match *self {
            StatementFilter::All => "all transactions".to_string(),
            StatementFilter::DateRange { start, end } => {
                format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
            }
            StatementFilter::Count(n) => format!("last {n} transactions"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementFormat {
    Pdf,
    Xlsx,
}

impl StatementFormat {
    /// Accepts exactly `pdf` or `xlsx`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "pdf" => Ok(StatementFormat::Pdf),
            "xlsx" => Ok(StatementFormat::Xlsx),
            _ => Err(TallyError::BadRequest(format!("unsupported export format '{raw}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Statement assembly
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StatementRow {
    pub created_at: String,
    pub text: String,
    pub category: Option<String>,
    /// Positive magnitude; direction in `is_income`.
    pub amount: f64,
    pub is_income: bool,
    pub transfer: Option<String>,
    pub currency: String,
}

#[derive(Debug)]
pub struct Statement {
    pub account: Account,
    pub rows: Vec<StatementRow>,
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub period_label: String,
    pub generated_at: String,
}

pub struct Export {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: &'static str,
}

/// Fetch the filtered transaction set, newest first, with category names
/// joined in. Totals are summed over exactly this set, never read from the
/// analytics cache, so the export always matches the rows it shows.
pub fn build_statement(
    conn: &Connection,
    account_id: i64,
    requester_id: i64,
    filter: StatementFilter,
) -> Result<Statement> {
    filter.validate()?;
    if !has_account_access(conn, account_id, requester_id)? {
        return Err(TallyError::NotFound(format!("account {account_id}")));
    }
    let account = get_account(conn, account_id)?
        .ok_or_else(|| TallyError::NotFound(format!("account {account_id}")))?;

    let base = "SELECT t.created_at, t.text, c.name, t.amount, t.is_income, t.transfer, t.currency \
                FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
                WHERE t.account_id = ?1";
    let (sql, params): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match filter {
        StatementFilter::All => (
            format!("{base} ORDER BY t.created_at DESC, t.id DESC"),
            vec![Box::new(account_id)],
        ),
        StatementFilter::DateRange { start, end } => (
            format!(
                "{base} AND t.created_at >= ?2 AND t.created_at <= ?3 \
                 ORDER BY t.created_at DESC, t.id DESC"
            ),
            vec![
                Box::new(account_id),
                Box::new(day_start_ts(start)),
                Box::new(day_end_ts(end)),
            ],
        ),
        StatementFilter::Count(n) => (
            format!("{base} ORDER BY t.created_at DESC, t.id DESC LIMIT ?2"),
            vec![Box::new(account_id), Box::new(n)],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows: Vec<StatementRow> = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(StatementRow {
                created_at: row.get(0)?,
                text: row.get(1)?,
                category: row.get(2)?,
                amount: row.get(3)?,
                is_income: row.get(4)?,
                transfer: row.get(5)?,
                currency: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total_income: f64 = rows.iter().filter(|r| r.is_income).map(|r| r.amount).sum();
    let total_expense: f64 = rows.iter().filter(|r| !r.is_income).map(|r| r.amount).sum();

    Ok(Statement {
        account,
        total_income,
        total_expense,
        balance: total_income - total_expense,
        rows,
        period_label: filter.label(),
        generated_at: now_ts(),
    })
}

/// Render a point-in-time statement for download.
pub fn generate(
    conn: &Connection,
    account_id: i64,
    requester_id: i64,
    filter: StatementFilter,
    format: StatementFormat,
) -> Result<Export> {
    let statement = build_statement(conn, account_id, requester_id, filter)?;
    match format {
        #[cfg(feature = "pdf")]
        StatementFormat::Pdf => Ok(Export {
            bytes: crate::pdf::render_statement(&statement)?,
            content_type: "application/pdf",
            filename: "statement.pdf",
        }),
        #[cfg(not(feature = "pdf"))]
        StatementFormat::Pdf => Err(TallyError::BadRequest(
            "pdf support not built into this binary".to_string(),
        )),
        StatementFormat::Xlsx => Ok(Export {
            bytes: crate::xlsx::render_statement(&statement)?,
            content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            filename: "statement.xlsx",
        }),
    }
}
