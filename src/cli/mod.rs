pub mod accounts;
pub mod analytics;
pub mod dashboard;
pub mod import;
pub mod init;
pub mod statement;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally", about = "Personal and shared finance tracker CLI.")]
pub struct Cli {
    /// Acting user id (default: the settings default user)
    #[arg(long, global = true)]
    pub user: Option<i64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up tally: choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage ledger accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Stage and confirm spreadsheet imports.
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Owner-wide dashboard: counts, extremes, daily series, totals.
    Dashboard,
    /// Windowed analytics for one account, compared against the
    /// immediately preceding window.
    Analytics {
        /// Account ID
        account: i64,
        /// Window: 7d, month, last-month, year, or YYYY-MM-DD..YYYY-MM-DD
        #[arg(long, default_value = "30d")]
        window: String,
    },
    /// Export an account statement as PDF or XLSX.
    Statement {
        /// Account ID
        account: i64,
        /// Export format: pdf or xlsx
        #[arg(long, default_value = "pdf")]
        format: String,
        /// Range start: YYYY-MM-DD (requires --to)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Range end: YYYY-MM-DD, inclusive (requires --from)
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Only the most recent N transactions
        #[arg(long, conflicts_with_all = ["from", "to"])]
        last: Option<i64>,
        /// Output path (default: ./statement.<format>)
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name, e.g. 'Everyday Checking'
        name: String,
        /// Opening balance (negative for a debt position)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        balance: f64,
        /// 3-letter currency code
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// List your accounts with their cached analytics.
    List,
    /// Update name, balance, or currency. Balance overwrites the cache.
    Update {
        /// Account ID
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        balance: Option<f64>,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Delete an account and everything hanging off it.
    Delete {
        /// Account ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Parse a CSV/XLSX file and stage its rows without touching the ledger.
    Stage {
        /// Path to CSV or XLSX file
        file: String,
        /// Account ID to import into
        #[arg(long)]
        account: i64,
    },
    /// Commit a staged import into the ledger.
    Confirm {
        /// Import ID (shown by `tally import stage`)
        id: i64,
    },
    /// Preview a staged import.
    Show {
        /// Import ID
        id: i64,
    },
}
