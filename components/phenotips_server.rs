//! Command-line entry point: run the REST server or ask for diagnosis suggestions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phenotips_rest::{load_diagnosis_service, serve, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "phenotips-server", version, about = "PhenoTips patient access and diagnosis services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serves the owner and consent REST API.
    Serve {
        /// TOML configuration file.
        #[arg(long, default_value = "config/server.toml")]
        config: PathBuf,
    },
    /// Prints suggested diagnoses as a JSON array.
    Suggest(SuggestArgs),
}

#[derive(Parser, Debug)]
struct SuggestArgs {
    /// TOML configuration file.
    #[arg(long, default_value = "config/server.toml")]
    config: PathBuf,
    /// Standard phenotype id, e.g. HP:0001251. Repeatable.
    #[arg(long = "phenotype")]
    phenotypes: Vec<String>,
    /// Free-text phenotype description. Repeatable.
    #[arg(long = "nonstandard")]
    nonstandard: Vec<String>,
    /// Maximum number of suggestions.
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    limit: i32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config } => {
            let config = ServerConfig::load(&config)?;
            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            runtime.block_on(serve(&config))
        }
        Commands::Suggest(args) => {
            let config = ServerConfig::load(&args.config)?;
            let script = load_diagnosis_service(&config)?;
            let suggestions = script.get(&args.phenotypes, &args.nonstandard, args.limit);
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
            Ok(())
        }
    }
}
