use assert_cmd::Command;
use predicates::prelude::*;

fn tally(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.env("TALLY_DATA_DIR", data_dir);
    cmd
}

fn init(data_dir: &std::path::Path) {
    tally(data_dir)
        .args(["init", "--data-dir", &data_dir.to_string_lossy()])
        .assert()
        .success();
}

#[test]
fn init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    assert!(dir.path().join("tally.db").exists());
}

#[test]
fn add_and_list_accounts() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    tally(dir.path())
        .args(["accounts", "add", "Everyday", "--balance", "250", "--currency", "usd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Everyday"));

    tally(dir.path())
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Everyday"))
        .stdout(predicate::str::contains("250.00 USD"));
}

#[test]
fn duplicate_account_name_fails() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    tally(dir.path()).args(["accounts", "add", "Everyday"]).assert().success();
    tally(dir.path())
        .args(["accounts", "add", "Everyday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn accounts_are_scoped_per_user() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    tally(dir.path()).args(["accounts", "add", "Everyday"]).assert().success();
    // Same name under a different user is fine
    tally(dir.path())
        .args(["--user", "2", "accounts", "add", "Everyday"])
        .assert()
        .success();
    // And user 2 cannot delete user 1's account
    tally(dir.path())
        .args(["--user", "2", "accounts", "delete", "1"])
        .assert()
        .failure();
}

#[test]
fn invalid_currency_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());

    tally(dir.path())
        .args(["accounts", "add", "Everyday", "--currency", "DOLLARS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("currency"));
}

#[test]
fn import_stage_show_confirm_flow() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    tally(dir.path()).args(["accounts", "add", "Everyday"]).assert().success();

    let csv = dir.path().join("upload.csv");
    std::fs::write(
        &csv,
        "Text,Amount,Type,Transfer,Category,Date\n\
         Salary,2500,income,-,Pay,2025-01-05\n\
         Coffee,4.50,expense,-,Dining,2025-01-06\n",
    )
    .unwrap();

    tally(dir.path())
        .args(["import", "stage", &csv.to_string_lossy(), "--account", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Staged 2 transaction(s) as import #1"));

    tally(dir.path())
        .args(["import", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Coffee"))
        .stdout(predicate::str::contains("staged"));

    tally(dir.path())
        .args(["import", "confirm", "1"])
        .assert()
        .success();

    // Second confirm is rejected
    tally(dir.path())
        .args(["import", "confirm", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already imported"));

    tally(dir.path())
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2,495.50 USD"));
}

#[test]
fn import_rejects_missing_header() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    tally(dir.path()).args(["accounts", "add", "Everyday"]).assert().success();

    let csv = dir.path().join("bad.csv");
    std::fs::write(&csv, "Text,Amount,Type\nCoffee,4.50,expense\n").unwrap();

    tally(dir.path())
        .args(["import", "stage", &csv.to_string_lossy(), "--account", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("header"));
}

#[test]
fn dashboard_shows_totals() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    tally(dir.path())
        .args(["accounts", "add", "Everyday", "--balance", "100"])
        .assert()
        .success();

    tally(dir.path())
        .args(["dashboard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Everyday"))
        .stdout(predicate::str::contains("Total balance:  100.00"));
}

#[test]
fn analytics_rejects_bad_window() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    tally(dir.path()).args(["accounts", "add", "Everyday"]).assert().success();

    tally(dir.path())
        .args(["analytics", "1", "--window", "0d"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duration"));
}

#[test]
fn statement_writes_xlsx_file() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    tally(dir.path())
        .args(["accounts", "add", "Everyday", "--balance", "100"])
        .assert()
        .success();

    let out = dir.path().join("out.xlsx");
    tally(dir.path())
        .args(["statement", "1", "--format", "xlsx", "--output", &out.to_string_lossy()])
        .assert()
        .success();
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[cfg(feature = "pdf")]
#[test]
fn statement_writes_pdf_file() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    tally(dir.path())
        .args(["accounts", "add", "Everyday", "--balance", "100"])
        .assert()
        .success();

    let out = dir.path().join("out.pdf");
    tally(dir.path())
        .args(["statement", "1", "--output", &out.to_string_lossy()])
        .assert()
        .success();
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn statement_rejects_partial_or_mixed_filters() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    tally(dir.path()).args(["accounts", "add", "Everyday"]).assert().success();

    // --from without --to
    tally(dir.path())
        .args(["statement", "1", "--from", "2025-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--to"));
    // --last alongside a date range
    tally(dir.path())
        .args(["statement", "1", "--from", "2025-01-01", "--to", "2025-01-31", "--last", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--last"));
}

#[test]
fn statement_rejects_unknown_format() {
    let dir = tempfile::tempdir().unwrap();
    init(dir.path());
    tally(dir.path()).args(["accounts", "add", "Everyday"]).assert().success();

    tally(dir.path())
        .args(["statement", "1", "--format", "csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported export format"));
}
