use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed input: missing headers, empty sheet, bad date range or
    /// limit, unsupported export format.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Ownership or share check failed. Also covers "forbidden" so callers
    /// cannot distinguish a missing row from one they may not see.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate account or category name within an owner's scope.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Spreadsheet error: {0}")]
    Sheet(String),

    #[cfg(feature = "pdf")]
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Workbook error: {0}")]
    Xlsx(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;

/// Map a UNIQUE-constraint failure to `Conflict`, leaving other database
/// errors untouched. Two concurrent writers can both pass the friendly
/// pre-check and race on the index; the loser must still surface as a
/// conflict rather than a generic database error.
pub fn constraint_as_conflict(e: rusqlite::Error, what: &str) -> TallyError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            TallyError::Conflict(what.to_string())
        }
        _ => TallyError::Db(e),
    }
}
