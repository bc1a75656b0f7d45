use serde::{Deserialize, Serialize};

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub balance: f64,
    pub currency: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    pub account_id: i64,
    pub owner_id: i64,
    pub created_by: i64,
    pub updated_by: i64,
    pub text: String,
    /// Positive magnitude; direction is carried by `is_income`.
    pub amount: f64,
    pub is_income: bool,
    pub category_id: Option<i64>,
    pub transfer: Option<String>,
    pub currency: String,
    pub created_at: String,
}

/// The per-account materialized aggregate cache. One row per account,
/// created and deleted with it, updated incrementally rather than recomputed
/// from the transaction ledger on read.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Analytics {
    pub id: i64,
    pub account_id: i64,
    pub owner_id: i64,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub previous_income: f64,
    pub previous_expense: f64,
    pub previous_balance: f64,
    pub income_pct_change: f64,
    pub expense_pct_change: f64,
    pub balance_pct_change: f64,
}

/// A parsed-but-not-yet-committed prospective transaction, held as JSON in
/// `import_data.data` between the stage and confirm phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub account_id: i64,
    pub owner_id: i64,
    pub created_by: i64,
    pub updated_by: i64,
    pub text: String,
    pub amount: f64,
    pub is_income: bool,
    pub category_id: Option<i64>,
    pub transfer: Option<String>,
    pub currency: String,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub id: i64,
    pub account_id: i64,
    pub user_id: i64,
    pub total_records: i64,
    pub error_records: i64,
    pub is_imported: bool,
    pub checksum: Option<String>,
}
