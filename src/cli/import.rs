use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::amount;
use crate::importer::{confirm_import, get_staged, stage_import};
use crate::settings::db_path;

pub fn stage(user: i64, file: &str, account: i64) -> Result<()> {
    let bytes = std::fs::read(file)?;
    let mut conn = get_connection(&db_path())?;
    let outcome = stage_import(&mut conn, account, user, &bytes)?;
    println!(
        "Staged {} transaction(s) as import #{}. Review with `tally import show {}`, \
         then commit with `tally import confirm {}`.",
        outcome.total_records, outcome.import_id, outcome.import_id, outcome.import_id
    );
    Ok(())
}

pub fn confirm(user: i64, id: i64) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    confirm_import(&mut conn, id, user)?;
    println!("Import #{id} committed to the ledger");
    Ok(())
}

pub fn show(user: i64, id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let preview = get_staged(&conn, id, user)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Text", "Amount", "Type", "Transfer", "Currency"]);
    for row in &preview.rows {
        table.add_row(vec![
            Cell::new(row.created_at.get(..10).unwrap_or(&row.created_at)),
            Cell::new(&row.text),
            Cell::new(amount(row.amount)),
            Cell::new(if row.is_income { "income" } else { "expense" }),
            Cell::new(row.transfer.as_deref().unwrap_or("")),
            Cell::new(&row.currency),
        ]);
    }
    let status = if preview.is_imported { "imported" } else { "staged" };
    println!(
        "Import #{id}: {} record(s), {status}\n{table}",
        preview.total_records
    );
    Ok(())
}
