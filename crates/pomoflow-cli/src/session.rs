//! Opening the application state for a command.

use pomoflow_core::{AppConfig, AppOptions, FocusApp, MemoryStore, Persistence, SqliteStore};

use crate::terminal;

/// Open the database named in `config` and load every store from it.
///
/// If the database cannot be opened the session runs on an in-memory store
/// and nothing is kept after exit.
pub fn open(config: &AppConfig) -> FocusApp {
    let persistence = match SqliteStore::open(&config.database_file) {
        Ok(store) => Persistence::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "database unavailable, changes will not be saved");
            Persistence::new(MemoryStore::new())
        }
    };
    FocusApp::load(persistence, terminal::adapters(), AppOptions::from(config))
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
