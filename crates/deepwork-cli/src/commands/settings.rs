use clap::Subcommand;
use deepwork_core::{Database, SettingsStore};

use super::print_json;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a setting (e.g. "soundType", "volume")
    Get { key: String },
    /// Set a setting; JSON values are accepted (e.g. '{"hours":1,"minutes":0}')
    Set { key: String, value: String },
    /// Print all settings
    List,
    /// Restore default settings
    Reset,
}

pub fn run(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let store = SettingsStore::new(&db);

    match action {
        SettingsAction::Get { key } => {
            let settings = serde_json::to_value(store.load()?)?;
            match settings.get(&key) {
                Some(value) => print_json(value)?,
                None => return Err(format!("unknown setting: {key}").into()),
            }
        }
        SettingsAction::Set { key, value } => {
            let settings = store.set(&key, &value)?;
            print_json(&settings)?;
        }
        SettingsAction::List => print_json(&store.load()?)?,
        SettingsAction::Reset => {
            store.reset()?;
            print_json(&store.load()?)?;
        }
    }
    Ok(())
}
