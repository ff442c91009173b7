//! sitectl: manage reverse-proxy sites from the command line.
//!
//! # Architecture Overview
//!
//! ```text
//!    sitectl site create web.json
//!        │
//!        ▼
//!   ┌──────────┐    ┌────────────┐    ┌──────────────┐    ┌────────────┐
//!   │  config  │───▶│ SiteClient │───▶│  Reconciler  │───▶│ Primitives │
//!   │ + logging│    │ (scoping,  │    │ reader +     │    │ (Document) │
//!   └──────────┘    │ validation)│    │ relations    │    └─────┬──────┘
//!                   └─────┬──────┘    └──────────────┘          │
//!                         │                                     │
//!                         ▼                                     │
//!                   ┌────────────┐   working copy               │
//!                   │  Storage   │◀─────────────────────────────┘
//!                   │ (versioned │   save / commit / abandon
//!                   │  + JSON)   │
//!                   └────────────┘
//! ```

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

use site_reconciler::config::loader::load_config;
use site_reconciler::observability::logging;
use site_reconciler::{ConfError, ManagerConfig, Scope, Site, SiteClient, Storage, Transactions};

#[derive(Parser)]
#[command(name = "sitectl")]
#[command(about = "Manage proxy sites (frontend + backends + routing) as one object", long_about = None)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State file; overrides `storage.path` from the configuration.
    #[arg(short, long)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the committed configuration version
    Version,
    /// Read and change sites
    #[command(subcommand)]
    Site(SiteCommands),
    /// Manage explicit transactions
    #[command(subcommand)]
    Transaction(TransactionCommands),
}

#[derive(Subcommand)]
enum SiteCommands {
    /// List all sites
    List {
        #[arg(short, long)]
        transaction: Option<String>,
    },
    /// Show one site
    Get {
        name: String,
        #[arg(short, long)]
        transaction: Option<String>,
    },
    /// Create a site from a JSON file (`-` reads stdin)
    Create {
        file: PathBuf,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Replace a site with the one in a JSON file (`-` reads stdin)
    Edit {
        name: String,
        file: PathBuf,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Delete a site with all its backends
    Delete {
        name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

#[derive(Subcommand)]
enum TransactionCommands {
    /// Open a transaction at a base version (defaults to the current one)
    Start {
        #[arg(short, long)]
        version: Option<i64>,
    },
    /// Commit a transaction
    Commit { id: String },
    /// Discard a transaction
    Delete { id: String },
    /// List open transactions
    List,
}

#[derive(Args)]
struct ScopeArgs {
    /// Apply inside this transaction; it is left open for a later commit.
    #[arg(short, long, conflicts_with = "version")]
    transaction: Option<String>,

    /// Base version of the implicit transaction (defaults to the current one).
    #[arg(short, long)]
    version: Option<i64>,
}

impl ScopeArgs {
    fn resolve(self, storage: &Storage) -> Result<Scope, ConfError> {
        match (self.transaction, self.version) {
            (Some(id), _) => Ok(Scope::Transaction(id)),
            (None, Some(version)) => Ok(Scope::Version(version)),
            (None, None) => Ok(Scope::Version(storage.version(None)?)),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ManagerConfig::default(),
    };
    logging::init(&config.observability);

    let storage_path = cli
        .storage
        .clone()
        .or_else(|| config.storage.path.as_ref().map(PathBuf::from));
    let storage = match &storage_path {
        Some(path) => Storage::open(path)?,
        None => Storage::in_memory(),
    };
    tracing::debug!(storage = ?storage_path, validation = config.validation.enabled, "sitectl starting");

    let client = SiteClient::new(storage).with_validation(config.validation.enabled);

    match cli.command {
        Commands::Version => {
            let version = client.transactions().version(None)?;
            print_json(&serde_json::json!({ "version": version }))?;
        }
        Commands::Site(command) => run_site(&client, command)?,
        Commands::Transaction(command) => run_transaction(client.transactions(), command)?,
    }

    Ok(())
}

fn run_site(
    client: &SiteClient<Storage>,
    command: SiteCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SiteCommands::List { transaction } => {
            let (version, sites) = client.get_sites(transaction.as_deref())?;
            print_json(&serde_json::json!({ "version": version, "sites": sites }))?;
        }
        SiteCommands::Get { name, transaction } => {
            let (version, site) = client.get_site(&name, transaction.as_deref())?;
            print_json(&serde_json::json!({ "version": version, "site": site }))?;
        }
        SiteCommands::Create { file, scope } => {
            let site = read_site_file(&file)?;
            let scope = scope.resolve(client.transactions())?;
            client.create_site(&site, &scope)?;
            print_outcome(client, &scope)?;
        }
        SiteCommands::Edit { name, file, scope } => {
            let site = read_site_file(&file)?;
            let scope = scope.resolve(client.transactions())?;
            client.edit_site(&name, &site, &scope)?;
            print_outcome(client, &scope)?;
        }
        SiteCommands::Delete { name, scope } => {
            let scope = scope.resolve(client.transactions())?;
            client.delete_site(&name, &scope)?;
            print_outcome(client, &scope)?;
        }
    }
    Ok(())
}

fn run_transaction(
    storage: &Storage,
    command: TransactionCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        TransactionCommands::Start { version } => {
            let version = match version {
                Some(version) => version,
                None => storage.version(None)?,
            };
            print_json(&storage.start_transaction(version)?)?;
        }
        TransactionCommands::Commit { id } => {
            let version = storage.commit_transaction(&id)?;
            print_json(&serde_json::json!({ "committed": id, "version": version }))?;
        }
        TransactionCommands::Delete { id } => {
            storage.delete_transaction(&id)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        TransactionCommands::List => {
            print_json(&storage.transactions())?;
        }
    }
    Ok(())
}

fn read_site_file(path: &PathBuf) -> Result<Site, Box<dyn std::error::Error>> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&content)?)
}

fn print_outcome(
    client: &SiteClient<Storage>,
    scope: &Scope,
) -> Result<(), Box<dyn std::error::Error>> {
    match scope {
        Scope::Transaction(id) => print_json(&serde_json::json!({ "transaction": id })),
        Scope::Version(_) => {
            let version = client.transactions().version(None)?;
            print_json(&serde_json::json!({ "version": version }))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
