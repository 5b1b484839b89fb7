use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod host;

#[derive(Parser)]
#[command(name = "deepwork", version, about = "Deep Work Timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Countdown control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Recorded sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Export and merge-import backups
    Backup {
        #[command(subcommand)]
        action: commands::backup::BackupAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// User settings (sound, notifications, default duration)
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a shell completion script
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Initialize tracing subscriber with environment filter. Logs go to stderr so
/// stdout stays machine-readable.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Backup { action } => commands::backup::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "deepwork", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
