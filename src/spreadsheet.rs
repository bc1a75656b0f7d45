use std::io::Cursor;

use calamine::{Data, Reader};

use crate::error::{Result, TallyError};

/// A single parsed cell. Numbers are kept numeric so Excel date serials and
/// amounts survive without a lossy round-trip through text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
        }
    }
}

/// First sheet of an uploaded workbook, rows keyed by header position.
#[derive(Debug)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Case-insensitive header lookup.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    pub fn cell<'a>(&'a self, row: &'a [Cell], name: &str) -> &'a Cell {
        match self.column(name) {
            Some(idx) => row.get(idx).unwrap_or(&Cell::Empty),
            None => &Cell::Empty,
        }
    }
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{e:?}")),
    }
}

/// Parse an uploaded byte buffer into its first sheet. XLSX buffers are
/// recognized by the ZIP container magic; anything else is treated as CSV.
pub fn parse_workbook(bytes: &[u8]) -> Result<Sheet> {
    if bytes.starts_with(b"PK") {
        parse_xlsx(bytes)
    } else {
        parse_csv(bytes)
    }
}

fn parse_xlsx(bytes: &[u8]) -> Result<Sheet> {
    let mut workbook: calamine::Xlsx<_> = calamine::Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| TallyError::Sheet(format!("failed to open workbook: {e}")))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| TallyError::Sheet("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| TallyError::Sheet(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows_iter = range.rows();
    let headers = match rows_iter.next() {
        Some(row) => row.iter().map(|d| data_to_cell(d).to_text()).collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for row in rows_iter {
        let cells: Vec<Cell> = row.iter().map(data_to_cell).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(cells);
    }
    Ok(Sheet { headers, rows })
}

fn parse_csv(bytes: &[u8]) -> Result<Sheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut headers = Vec::new();
    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        if i == 0 {
            headers = record.iter().map(|f| f.trim().to_string()).collect();
            continue;
        }
        let cells: Vec<Cell> = record
            .iter()
            .map(|f| {
                let f = f.trim();
                if f.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(f.to_string())
                }
            })
            .collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(cells);
    }
    Ok(Sheet { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_headers_and_rows() {
        let data = b"Text,Amount,Type,Transfer,Category,Date\n\
                     Coffee,4.5,expense,-,Dining,2024-01-05\n";
        let sheet = parse_workbook(data).unwrap();
        assert_eq!(sheet.headers.len(), 6);
        assert_eq!(sheet.rows.len(), 1);
        let row = &sheet.rows[0];
        assert_eq!(sheet.cell(row, "text").to_text(), "Coffee");
        assert_eq!(sheet.cell(row, "AMOUNT").to_text(), "4.5");
        assert_eq!(sheet.cell(row, "Date").to_text(), "2024-01-05");
    }

    #[test]
    fn test_parse_csv_skips_blank_rows() {
        let data = b"Text,Amount,Type,Transfer,Category,Date\n\
                     ,,,,,\n\
                     Lunch,12,expense,-,Dining,2024-01-06\n";
        let sheet = parse_workbook(data).unwrap();
        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn test_parse_empty_csv() {
        let sheet = parse_workbook(b"Text,Amount\n").unwrap();
        assert_eq!(sheet.headers, vec!["Text", "Amount"]);
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let sheet = Sheet {
            headers: vec!["Text".to_string(), "Amount".to_string()],
            rows: vec![],
        };
        assert_eq!(sheet.column("text"), Some(0));
        assert_eq!(sheet.column("AMOUNT"), Some(1));
        assert_eq!(sheet.column("Missing"), None);
    }

    #[test]
    fn test_cell_to_text_trims_and_formats() {
        assert_eq!(Cell::Text("  hi  ".to_string()).to_text(), "hi");
        assert_eq!(Cell::Number(45667.0).to_text(), "45667");
        assert_eq!(Cell::Number(4.5).to_text(), "4.5");
        assert_eq!(Cell::Empty.to_text(), "");
    }

    #[test]
    fn test_non_zip_buffer_falls_back_to_csv() {
        let data = b"Text,Amount,Type,Transfer,Category,Date\nA,1,income,-,Pay,2024-02-01\n";
        let sheet = parse_workbook(data).unwrap();
        assert_eq!(sheet.rows.len(), 1);
    }
}
