//! # viewsync CLI
//! This module implements the CLI interface for viewsync: command parsing,
//! wiring of the HTTP collaborators, and user-visible output.
//!
//! All decision logic (freshness, conversion, indexing) lives in the
//! [`viewsync-core`] crate. This module is strictly CLI glue.
//!
//! ## How To Use
//! - For command-line users: run the `viewsync` binary with `--help`.
//! - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
//!
//! [`viewsync-core`]: ../../viewsync-core/
use crate::conversion::ConversionClient;
use crate::elastic::ElasticIndex;
use crate::load_config::{load_config, CliConfig};
use crate::storage::StorageClient;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use viewsync_core::Synchroniser;

/// CLI for viewsync: browse stored files, open converted documents, keep the search index in sync.
#[derive(Parser)]
#[clap(
    name = "viewsync",
    version,
    about = "Browse remote storage, view converted documents and keep a search index in sync"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true, default_value = "viewsync.yaml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a viewer URL for a file, converting it first if needed
    View { file_id: String },
    /// Bring the search index entry for a file up to date
    Index { file_id: String },
    /// Search your indexed files
    Search { query: String },
    /// List a folder's entries with their navigation paths
    Browse {
        #[clap(default_value = "0")]
        folder_id: String,
    },
    /// Print a file's current metadata
    File { file_id: String },
    /// List converted documents known to the viewer service
    Documents,
}

struct Clients {
    storage: StorageClient,
    conversion: ConversionClient,
    index: ElasticIndex,
}

impl Clients {
    fn from_config(config: &CliConfig) -> Result<Self> {
        Ok(Self {
            storage: StorageClient::new(&config.storage.api_base)?,
            conversion: ConversionClient::new(
                &config.conversion.api_base,
                &config.conversion.content_api_base,
                &config.view_api_key,
            )?,
            index: ElasticIndex::new(&config.index.url, &config.index.name)?,
        })
    }
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = load_config(&cli.config)?;
    let clients = Clients::from_config(&config)?;
    let sync = Synchroniser::new(
        &clients.storage,
        &clients.conversion,
        &clients.index,
        &config.sync,
    );
    let user_id = config.session.user_id.as_str();
    let credentials = &config.session.credentials;

    match &cli.command {
        Commands::View { file_id } => {
            tracing::info!(command = "view", file_id = %file_id, "Synchronising for viewing");
            let url = sync
                .synchronise_for_viewing(user_id, credentials, file_id)
                .await?;
            println!("{url}");
            Ok(())
        }
        Commands::Index { file_id } => {
            tracing::info!(command = "index", file_id = %file_id, "Synchronising for indexing");
            let report = sync
                .synchronise_for_indexing(user_id, credentials, file_id)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Search { query } => {
            let hits = sync.search(user_id, query).await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
            Ok(())
        }
        Commands::Browse { folder_id } => {
            let listing = sync.browse(credentials, folder_id).await?;
            println!("{} ({})", listing.name, listing.id);
            for entry in &listing.entries {
                println!("  {:<8} {:<40} {}", entry.kind.as_str(), entry.name, entry.href());
            }
            Ok(())
        }
        Commands::File { file_id } => {
            let file = sync.file(credentials, file_id).await?;
            println!("{}", serde_json::to_string_pretty(&file)?);
            Ok(())
        }
        Commands::Documents => {
            let documents = sync.converted_documents().await?;
            println!("{}", serde_json::to_string_pretty(&documents)?);
            Ok(())
        }
    }
}
