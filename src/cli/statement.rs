use std::path::PathBuf;

use chrono::NaiveDate;

use crate::db::get_connection;
use crate::error::{Result, TallyError};
use crate::settings::db_path;
use crate::statement::{generate, StatementFilter, StatementFormat};

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| TallyError::BadRequest(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

pub fn run(
    user: i64,
    account: i64,
    format: &str,
    from: Option<String>,
    to: Option<String>,
    last: Option<i64>,
    output: Option<String>,
) -> Result<()> {
    let format = StatementFormat::parse(format)?;
    let filter = match (from, to, last) {
        (Some(from), Some(to), None) => StatementFilter::DateRange {
            start: parse_date(&from)?,
            end: parse_date(&to)?,
        },
        (None, None, Some(n)) => StatementFilter::Count(n),
        (None, None, None) => StatementFilter::All,
        // clap's requires/conflicts rules reject the remaining combinations
        _ => unreachable!("argument combination rejected by the parser"),
    };

    let conn = get_connection(&db_path())?;
    let export = generate(&conn, account, user, filter, format)?;

    let path = output.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(export.filename));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, &export.bytes)?;
    println!("Wrote {} ({})", path.display(), export.content_type);
    Ok(())
}
