use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Stored timestamp format. Lexicographic order matches chronological
/// order, and the first 10 characters are the calendar day.
pub const TS_FMT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

pub fn now_ts() -> String {
    chrono::Local::now().naive_local().format(TS_FMT).to_string()
}

/// Inclusive lower bound for a calendar day.
pub fn day_start_ts(date: NaiveDate) -> String {
    format!("{}T00:00:00.000", date.format("%Y-%m-%d"))
}

/// Inclusive upper bound for a calendar day (end-of-day semantics for
/// user-supplied range ends).
pub fn day_end_ts(date: NaiveDate) -> String {
    format!("{}T23:59:59.999", date.format("%Y-%m-%d"))
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial as i64))
}

fn parse_mdy(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].parse().ok()?;
    let d: u32 = parts[1].parse().ok()?;
    let y: i32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Parse a date cell from an imported sheet. Accepts ISO (`2024-01-05`),
/// US `M/D/YYYY`, and a bare Excel serial number.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Some(d) = parse_mdy(raw) {
        return Some(d);
    }
    if let Ok(serial) = raw.parse::<f64>() {
        return excel_serial_to_date(serial);
    }
    None
}

/// Parse a stored timestamp back into a datetime. Accepts the full stored
/// format and a bare ISO date (rehydrated as midnight).
pub fn parse_ts(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, TS_FMT) {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(45667.0),
            NaiveDate::from_ymd_opt(2025, 1, 10)
        );
    }

    #[test]
    fn test_parse_flexible_date_iso() {
        assert_eq!(
            parse_flexible_date("2024-01-05"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
    }

    #[test]
    fn test_parse_flexible_date_mdy() {
        assert_eq!(
            parse_flexible_date("01/15/2025"),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(parse_flexible_date("13/01/2025"), None); // month 13
        assert_eq!(parse_flexible_date("02/30/2025"), None); // Feb 30
    }

    #[test]
    fn test_parse_flexible_date_serial() {
        assert_eq!(
            parse_flexible_date("45667"),
            NaiveDate::from_ymd_opt(2025, 1, 10)
        );
    }

    #[test]
    fn test_parse_flexible_date_garbage() {
        assert_eq!(parse_flexible_date("not a date"), None);
        assert_eq!(parse_flexible_date(""), None);
    }

    #[test]
    fn test_day_bounds_sort_lexicographically() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let start = day_start_ts(d);
        let end = day_end_ts(d);
        assert!(start < end);
        assert!(end < day_start_ts(d.succ_opt().unwrap()));
    }

    #[test]
    fn test_parse_ts_roundtrip() {
        let ts = "2025-01-15T13:45:00.250";
        let dt = parse_ts(ts).unwrap();
        assert_eq!(dt.format(TS_FMT).to_string(), ts);
    }

    #[test]
    fn test_parse_ts_bare_date() {
        let dt = parse_ts("2025-01-15").unwrap();
        assert_eq!(dt.format(TS_FMT).to_string(), "2025-01-15T00:00:00.000");
    }
}
