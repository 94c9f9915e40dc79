use clap::{Parser, Subcommand};
use pomoflow_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod session;
mod terminal;

#[derive(Parser)]
#[command(name = "pomoflow", version, about = "pomoflow focus timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// User settings
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so stdout stays machine-readable.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_env("POMOFLOW_LOG")
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let loaded = AppConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();
    init_tracing(&config);
    if let Err(e) = &loaded {
        tracing::warn!(error = %e, "config unavailable, using defaults");
    }

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action, &config),
        Commands::Task { action } => commands::task::run(action, &config),
        Commands::Stats { action } => commands::stats::run(action, &config),
        Commands::Config { action } => commands::config::run(action, &config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
