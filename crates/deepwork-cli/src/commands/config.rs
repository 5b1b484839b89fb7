use clap::Subcommand;
use deepwork_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by dotted key (e.g. "backup.interval_hours")
    Get { key: String },
    /// Change one value and write config.toml
    Set { key: String, value: String },
    /// Print the whole configuration as JSON
    List,
    /// Overwrite config.toml with the defaults
    Reset,
    /// Print where config.toml lives
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            if let Some(stored) = config.get(&key) {
                println!("{key} = {stored}");
            }
        }
        ConfigAction::List => {
            super::print_json(&Config::load()?)?;
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            super::print_json(&Config::default())?;
        }
        ConfigAction::Path => println!("{}", Config::path()?.display()),
    }
    Ok(())
}
