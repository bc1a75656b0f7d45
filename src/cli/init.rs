use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{
    get_data_dir, save_settings, settings_file_exists, shellexpand_path, Settings,
};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let dir = match data_dir {
        Some(raw) => std::path::PathBuf::from(shellexpand_path(&raw)),
        None => get_data_dir(),
    };
    std::fs::create_dir_all(&dir)?;

    let db_path = dir.join("tally.db");
    let existed = db_path.exists();
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;

    // When TALLY_DATA_DIR drives the location there is nothing to persist.
    if std::env::var("TALLY_DATA_DIR").is_err() && !settings_file_exists() {
        save_settings(&Settings {
            data_dir: dir.to_string_lossy().to_string(),
            ..Settings::default()
        })?;
    }

    if existed {
        println!("Database ready at {}", db_path.display());
    } else {
        println!("Initialized new database at {}", db_path.display());
    }
    Ok(())
}
