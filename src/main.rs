mod accounts;
mod analytics;
mod cli;
mod dates;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod settings;
mod spreadsheet;
mod statement;
mod xlsx;

use clap::Parser;

use cli::{AccountsCommands, Cli, Commands, ImportCommands};

fn main() {
    let cli = Cli::parse();
    let user = cli.user.unwrap_or_else(|| settings::load_settings().default_user);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add { name, balance, currency } => {
                cli::accounts::add(user, &name, balance, &currency)
            }
            AccountsCommands::List => cli::accounts::list(user),
            AccountsCommands::Update { id, name, balance, currency } => {
                cli::accounts::update(user, id, name, balance, currency)
            }
            AccountsCommands::Delete { id } => cli::accounts::delete(user, id),
        },
        Commands::Import { command } => match command {
            ImportCommands::Stage { file, account } => cli::import::stage(user, &file, account),
            ImportCommands::Confirm { id } => cli::import::confirm(user, id),
            ImportCommands::Show { id } => cli::import::show(user, id),
        },
        Commands::Dashboard => cli::dashboard::run(user),
        Commands::Analytics { account, window } => cli::analytics::run(user, account, &window),
        Commands::Statement { account, format, from, to, last, output } => {
            cli::statement::run(user, account, &format, from, to, last, output)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
