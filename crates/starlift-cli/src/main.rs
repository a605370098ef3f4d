//! The `starlift` binary: bulk imports into a Northstar instance.
//!
//! Every import run is gated on a confirmation naming the target instance —
//! these are production writes, and pointing a file at the wrong URI is the
//! classic operator mistake.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use starlift_client::ApiClient;
use starlift_core::AppConfig;
use starlift_import::address::{resolve_file, AddressCache};
use starlift_import::entity::{accounts, balances, contacts, next_bill_dates, notes, services};
use starlift_import::ImportSummary;

#[derive(Debug, Parser)]
#[command(name = "starlift")]
#[command(about = "Bulk importer for the Northstar billing API")]
struct Cli {
    /// Skip the confirmation prompt
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import one entity type from a delimited file
    Import {
        #[arg(value_enum)]
        entity: Entity,

        /// Path to the comma-delimited import file (no header row)
        #[arg(long)]
        file: PathBuf,

        /// Target entity kind for note imports
        #[arg(long, default_value = "accounts")]
        target: String,
    },
    /// Validate and correct the addresses in an accounts file
    ValidateAddresses {
        /// Path to the comma-delimited accounts file
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete the persistent address cache
    FlushCache,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Entity {
    Accounts,
    Contacts,
    Services,
    Notes,
    NextBillDates,
    Balances,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = starlift_core::load_app_config()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::FlushCache => {
            AddressCache::flush(&config.cache_path)?;
            println!("address cache flushed");
            Ok(())
        }
        Commands::ValidateAddresses { file } => {
            if !confirm(&config.uri, cli.yes)? {
                println!("aborted");
                return Ok(());
            }
            let client = connect(&config).await?;
            let summary = resolve_file(&client, &config, &file).await?;
            print_summary(&summary);
            Ok(())
        }
        Commands::Import {
            entity,
            file,
            target,
        } => {
            if !confirm(&config.uri, cli.yes)? {
                println!("aborted");
                return Ok(());
            }
            let client = connect(&config).await?;
            let summary = run_import(entity, &client, &config, &file, &target).await?;
            print_summary(&summary);
            Ok(())
        }
    }
}

/// Builds the API client and fails fast on bad credentials, before any row
/// is read or dispatched.
async fn connect(config: &AppConfig) -> anyhow::Result<ApiClient> {
    let client = ApiClient::from_config(config)?;
    client.verify_credentials().await?;
    Ok(client)
}

async fn run_import(
    entity: Entity,
    client: &ApiClient,
    config: &AppConfig,
    file: &Path,
    note_target: &str,
) -> anyhow::Result<ImportSummary> {
    let summary = match entity {
        Entity::Accounts => accounts::import(client, config, file).await?,
        Entity::Contacts => contacts::import(client, config, file).await?,
        Entity::Services => services::import(client, config, file).await?,
        Entity::Notes => notes::import(client, config, file, note_target).await?,
        Entity::NextBillDates => next_bill_dates::import(client, config, file).await?,
        Entity::Balances => balances::import(client, config, file).await?,
    };
    Ok(summary)
}

/// Ask the operator to confirm the target instance before writing to it.
fn confirm(uri: &str, skip: bool) -> anyhow::Result<bool> {
    if skip {
        return Ok(true);
    }
    print!("This will import data into {uri}. Type 'y' to proceed: ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn print_summary(summary: &ImportSummary) {
    println!(
        "{} rows succeeded, logged at {}",
        summary.successes,
        summary.success_log.display()
    );
    if summary.failures > 0 {
        println!(
            "{} rows failed, logged at {}",
            summary.failures,
            summary.failure_log.display()
        );
    }
    if let (Some(hits), Some(misses)) = (summary.cache_hits, summary.cache_misses) {
        println!("cached addresses were used {hits} times, and {misses} addresses had to be validated");
    }
    if let Some(validated) = &summary.validated_file {
        println!("validated rows written to {}", validated.display());
    }
}
