use std::collections::HashMap;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::accounts::{find_or_create_category, get_account};
use crate::analytics::{apply_bulk_deltas, Delta};
use crate::dates::{day_start_ts, now_ts, parse_ts};
use crate::error::{Result, TallyError};
use crate::models::PendingTransaction;
use crate::spreadsheet::{parse_workbook, Cell, Sheet};

/// Header set an uploaded sheet must carry, matched case-insensitively.
const REQUIRED_HEADERS: &[&str] = &["Text", "Amount", "Type", "Transfer", "Category", "Date"];

// ---------------------------------------------------------------------------
// Cell-level parsing
// ---------------------------------------------------------------------------

pub fn parse_amount(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => *n,
        Cell::Empty => 0.0,
        Cell::Text(raw) => {
            let s = raw.replace(',', "").replace('"', "").replace('$', "");
            let s = s.trim();
            if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
                return -inner.trim().parse::<f64>().unwrap_or(0.0);
            }
            s.parse().unwrap_or(0.0)
        }
    }
}

/// Normalize a date cell to the stored timestamp format. An unparseable
/// value is carried through verbatim so the confirm phase rejects it as a
/// whole-batch failure rather than silently dropping the row.
fn parse_date_cell(cell: &Cell) -> String {
    let parsed = match cell {
        Cell::Number(serial) => crate::dates::excel_serial_to_date(*serial),
        _ => crate::dates::parse_flexible_date(&cell.to_text()),
    };
    match parsed {
        Some(date) => day_start_ts(date),
        None => cell.to_text(),
    }
}

fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StageOutcome {
    pub import_id: i64,
    pub total_records: i64,
}

struct RowContext {
    account_id: i64,
    owner_id: i64,
    currency: String,
}

fn normalize_row(
    sheet: &Sheet,
    row: &[Cell],
    categories: &HashMap<String, i64>,
    ctx: &RowContext,
) -> PendingTransaction {
    let category_name = sheet.cell(row, "Category").to_text();
    let transfer = sheet.cell(row, "Transfer").to_text();
    PendingTransaction {
        account_id: ctx.account_id,
        owner_id: ctx.owner_id,
        created_by: ctx.owner_id,
        updated_by: ctx.owner_id,
        text: sheet.cell(row, "Text").to_text(),
        amount: parse_amount(sheet.cell(row, "Amount")),
        is_income: sheet.cell(row, "Type").to_text().eq_ignore_ascii_case("income"),
        category_id: categories.get(&category_name).copied(),
        transfer: if transfer.is_empty() { None } else { Some(transfer) },
        currency: ctx.currency.clone(),
        created_at: parse_date_cell(sheet.cell(row, "Date")),
    }
}

/// Parse an uploaded spreadsheet into a pending, reviewable import record.
/// Referenced category names are resolved (and created where new) so the
/// staged rows carry concrete category ids, but no transaction or analytics
/// row is touched, so an unconfirmed stage is fully reversible.
pub fn stage_import(
    conn: &mut Connection,
    account_id: i64,
    owner_id: i64,
    bytes: &[u8],
) -> Result<StageOutcome> {
    let account = get_account(conn, account_id)?
        .filter(|a| a.owner_id == owner_id)
        .ok_or_else(|| TallyError::NotFound(format!("account {account_id}")))?;

    let sheet = parse_workbook(bytes)?;
    if sheet.rows.is_empty() {
        return Err(TallyError::BadRequest("sheet has no data rows".to_string()));
    }
    for header in REQUIRED_HEADERS {
        if sheet.column(header).is_none() {
            return Err(TallyError::BadRequest(format!("missing required header '{header}'")));
        }
    }

    let mut names: Vec<String> = Vec::new();
    for row in &sheet.rows {
        let name = sheet.cell(row, "Category").to_text();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }

    let checksum = compute_checksum(bytes);
    let tx = conn.transaction()?;

    let mut categories: HashMap<String, i64> = HashMap::new();
    for name in &names {
        let id = find_or_create_category(&tx, owner_id, name)?;
        categories.insert(name.clone(), id);
    }

    let ctx = RowContext {
        account_id,
        owner_id,
        currency: account.currency,
    };
    let pending: Vec<PendingTransaction> = sheet
        .rows
        .iter()
        .map(|row| normalize_row(&sheet, row, &categories, &ctx))
        .collect();

    let data = serde_json::to_string(&pending)
        .map_err(|e| TallyError::Other(format!("failed to serialize staged rows: {e}")))?;
    let total = pending.len() as i64;
    let ts = now_ts();
    tx.execute(
        "INSERT INTO import_data (account_id, user_id, data, total_records, error_records, \
         is_imported, checksum, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?6, ?6)",
        rusqlite::params![account_id, owner_id, data, total, checksum, ts],
    )?;
    let import_id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(StageOutcome { import_id, total_records: total })
}

// ---------------------------------------------------------------------------
// Confirm
// ---------------------------------------------------------------------------

/// Materialize a staged import: bulk-insert the pending transactions, fold
/// their deltas into the analytics row, and flip `is_imported`, all in one
/// store transaction, exactly once. A second confirm fails with "already
/// imported" and changes nothing.
pub fn confirm_import(conn: &mut Connection, import_id: i64, owner_id: i64) -> Result<()> {
    let (account_id, data, is_imported): (i64, String, bool) = conn
        .query_row(
            "SELECT account_id, data, is_imported FROM import_data WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![import_id, owner_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                TallyError::NotFound(format!("import {import_id}"))
            }
            e => TallyError::Db(e),
        })?;
    if is_imported {
        return Err(TallyError::BadRequest("already imported".to_string()));
    }

    let pending: Vec<PendingTransaction> = serde_json::from_str(&data)
        .map_err(|e| TallyError::BadRequest(format!("corrupt staged data: {e}")))?;

    // One bad date fails the whole batch; there is no per-row skip.
    for row in &pending {
        if parse_ts(&row.created_at).is_none() {
            return Err(TallyError::BadRequest(format!(
                "invalid date '{}' in staged record",
                row.created_at
            )));
        }
    }

    let tx = conn.transaction()?;

    if !pending.is_empty() {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO transactions (account_id, owner_id, created_by, updated_by, text, \
             amount, is_income, category_id, transfer, currency, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for row in &pending {
            stmt.execute(rusqlite::params![
                row.account_id,
                row.owner_id,
                row.created_by,
                row.updated_by,
                row.text,
                row.amount,
                row.is_income,
                row.category_id,
                row.transfer,
                row.currency,
                row.created_at
            ])?;
        }
        drop(stmt);

        let deltas: Vec<Delta> = pending
            .iter()
            .map(|row| Delta { amount: row.amount, is_income: row.is_income })
            .collect();
        apply_bulk_deltas(&tx, account_id, owner_id, &deltas)?;
    }

    // Guarded flip: a concurrent confirm that won the race leaves zero rows
    // to update here, and this whole transaction rolls back.
    let flipped = tx.execute(
        "UPDATE import_data SET is_imported = 1, updated_at = ?1 WHERE id = ?2 AND is_imported = 0",
        rusqlite::params![now_ts(), import_id],
    )?;
    if flipped == 0 {
        return Err(TallyError::BadRequest("already imported".to_string()));
    }
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StagedPreview {
    pub rows: Vec<PendingTransaction>,
    pub total_records: i64,
    pub error_records: i64,
    pub is_imported: bool,
}

pub fn get_staged(conn: &Connection, import_id: i64, owner_id: i64) -> Result<StagedPreview> {
    let (data, total_records, error_records, is_imported): (String, i64, i64, bool) = conn
        .query_row(
            "SELECT data, total_records, error_records, is_imported \
             FROM import_data WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![import_id, owner_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                TallyError::NotFound(format!("import {import_id}"))
            }
            e => TallyError::Db(e),
        })?;
    let rows: Vec<PendingTransaction> = serde_json::from_str(&data)
        .map_err(|e| TallyError::BadRequest(format!("corrupt staged data: {e}")))?;
    Ok(StagedPreview { rows, total_records, error_records, is_imported })
}
