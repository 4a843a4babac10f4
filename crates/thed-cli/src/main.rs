use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "thed", version, about = "TheD task and habit tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with an email address
    Login {
        email: String,
    },
    /// Sign out
    Logout,
    /// Record your name and interests
    Onboard {
        #[arg(long)]
        name: String,
        /// Interest category: Creative, Student or Job (one or two)
        #[arg(long = "category", visible_alias = "tag", required = true)]
        categories: Vec<String>,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Add a generated quick task
    Boost,
    /// 12-hour routine flow
    Cycle {
        #[command(subcommand)]
        action: commands::cycle::CycleAction,
    },
    /// Streak and star statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Keep the clock running and print the queue on every change
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Login { email } => commands::auth::login(&email),
        Commands::Logout => commands::auth::logout(),
        Commands::Onboard { name, categories } => {
            commands::auth::onboard(&name, &categories).await
        }
        Commands::Task { action } => commands::task::run(action).await,
        Commands::Boost => commands::task::boost().await,
        Commands::Cycle { action } => commands::cycle::run(action).await,
        Commands::Stats { json } => commands::stats::run(json).await,
        Commands::Watch { seconds } => commands::watch::run(seconds).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "thed", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
