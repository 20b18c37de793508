//! proctor CLI: run, validate and inspect proctored test sessions.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "proctor", version, about = "Proctored assessment sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted test session
    Run {
        /// Test ID from the catalog
        #[arg(long)]
        test: String,

        /// Component the test belongs to
        #[arg(long)]
        component: String,

        /// Roadmap the component belongs to
        #[arg(long)]
        roadmap: String,

        /// Session script (.toml) describing the candidate's actions
        #[arg(long)]
        script: PathBuf,

        /// Catalog file or directory (overrides config)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Attempt history file (overrides config)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Wall-clock milliseconds per test second (overrides config)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate catalog TOML files
    Validate {
        /// Catalog file or directory
        #[arg(long)]
        catalog: PathBuf,
    },

    /// List the tests in a catalog
    List {
        /// Catalog file or directory (overrides config)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show recorded attempts
    History {
        /// Attempt history file (overrides config)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Only show attempts at this test
        #[arg(long)]
        test: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config, catalog and script
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["proctor=info", "proctor_core=info", "proctor_env=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            test,
            component,
            roadmap,
            script,
            catalog,
            history,
            config,
            tick_ms,
            format,
        } => {
            commands::run::execute(commands::run::RunArgs {
                test,
                component,
                roadmap,
                script,
                catalog,
                history,
                config,
                tick_ms,
                format,
            })
            .await
        }
        Commands::Validate { catalog } => commands::validate::execute(catalog),
        Commands::List { catalog, config } => commands::list::execute(catalog, config),
        Commands::History {
            history,
            test,
            config,
        } => commands::history::execute(history, test, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
