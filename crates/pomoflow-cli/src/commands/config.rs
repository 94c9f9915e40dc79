use clap::Subcommand;
use pomoflow_core::AppConfig;

use crate::session;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a setting value
    Get {
        /// Setting key (e.g. "focus_time", "theme")
        key: String,
    },
    /// Set a setting value
    Set {
        /// Setting key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings
    List,
    /// Reset settings to defaults
    Reset,
}

pub fn run(action: ConfigAction, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = session::open(config);

    match action {
        ConfigAction::Get { key } => match app.settings().get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(format!("unknown key: {key}").into()),
        },
        ConfigAction::Set { key, value } => {
            app.set_setting(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => session::print_json(app.settings())?,
        ConfigAction::Reset => {
            app.reset_settings();
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
