//! Catalog Harvester - command-line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harvester::catalog::{CatalogClient, RecordFetcher, SourceRecordLoader};
use harvester::config::{DatabaseConfig, HarvesterConfig};
use harvester::ingest::{
    export_records, transform_record, HarvestWorker, IngestOptions, IngestStats, Ingestor,
    LinkResolver, PgIndexer, PgStore, RecordStore,
};
use harvester::mapping::{AuthorityResolver, FieldMapper, MefAuthorityResolver};
use harvester::models::EntityKind;
use harvester::queue::{PgBroker, QueueGateway, QueueNames};
use harvester_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "harvester", version, about = "Harvest a legacy library catalog into the local store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue records for harvesting from the catalog listing or an id file
    Harvest {
        /// Identifiers requested per listing page
        #[arg(short, long)]
        size: Option<usize>,

        /// Listing cursor to start from
        #[arg(short, long)]
        next_id: Option<String>,

        /// File with one record identifier per line
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Process the harvest queue
    Run {
        /// Create every document without looking for an existing one
        #[arg(short, long)]
        initial: bool,

        /// Workers draining the queue concurrently
        #[arg(short = 'c', long, default_value_t = 1)]
        workers: usize,
    },

    /// Print the transformed form of one catalog record
    Record {
        #[arg(short, long)]
        bibid: String,
    },

    /// Print only the mapped document of one catalog record
    Document {
        #[arg(short, long)]
        bibid: String,
    },

    /// Print the largest document pid in the store
    MaxId,

    /// Export stored records as JSON
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },

    /// Administer the harvest queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
}

#[derive(Subcommand)]
enum ExportCommand {
    /// Write every stored record of one pid type to `{directory}/{pid_type}.json`
    Records {
        /// doc, hold or item
        #[arg(short = 't', long)]
        pid_type: EntityKind,

        #[arg(short, long, default_value = "export_data")]
        directory: PathBuf,
    },
}

#[derive(Subcommand)]
enum QueueCommand {
    Init,
    Purge,
    Delete,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .log_file_prefix("harvester")
        .filter_directives("harvester=info,sqlx=warn")
        .build();
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute(cli.command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn execute(command: Commands) -> Result<()> {
    let config = HarvesterConfig::from_env()?;

    match command {
        Commands::Harvest { size, next_id, file } => harvest(&config, size, next_id, file).await,
        Commands::Run { initial, workers } => run(&config, initial, workers).await,
        Commands::Record { bibid } => record(&config, &bibid).await,
        Commands::Document { bibid } => document(&config, &bibid).await,
        Commands::MaxId => max_id(&config).await,
        Commands::Export {
            command: ExportCommand::Records {
                pid_type,
                directory,
            },
        } => export(&config, pid_type, &directory).await,
        Commands::Queue { command } => queue(&config, command).await,
    }
}

async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .context("Failed to connect to database")?;

    PgStore::run_migrations(&pool).await?;
    info!("Database connection pool established");
    Ok(pool)
}

fn gateway(config: &HarvesterConfig, pool: &PgPool) -> QueueGateway {
    let broker = PgBroker::new(pool.clone(), config.queue.lease_secs);
    QueueGateway::new(
        Arc::new(broker),
        QueueNames::from(&config.queue),
        config.catalog.base_url.clone(),
    )
}

fn mapper(config: &HarvesterConfig) -> Result<FieldMapper> {
    let resolver = match &config.ingest.mef_url {
        Some(url) => {
            let resolver = MefAuthorityResolver::new(url.clone(), config.catalog.request_timeout_secs)?;
            Some(Arc::new(resolver) as Arc<dyn AuthorityResolver>)
        }
        None => None,
    };
    Ok(FieldMapper::new(resolver))
}

async fn harvest(
    config: &HarvesterConfig,
    size: Option<usize>,
    next_id: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let pool = connect(&config.database).await?;
    let gateway = gateway(config, &pool);
    gateway.init().await?;

    let count = match file {
        Some(path) => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let ids: Vec<String> = content.lines().map(str::to_string).collect();
            gateway.bulk_to_harvest(&ids).await?
        }
        None => {
            let client = CatalogClient::new(&config.catalog)?;
            let fetcher = RecordFetcher::new(client, gateway);
            let size = size.unwrap_or(config.catalog.page_size);
            fetcher.queue_all(size, next_id.as_deref()).await
        }
    };

    println!("Records queued: {count}");
    println!("Execute the \"run\" command to process the queue");
    Ok(())
}

async fn run(config: &HarvesterConfig, initial: bool, workers: usize) -> Result<()> {
    let pool = connect(&config.database).await?;
    let gateway = gateway(config, &pool);
    gateway.init().await?;

    let mut handles = Vec::new();
    for worker_id in 0..workers.max(1) {
        let client = CatalogClient::new(&config.catalog)?;
        let ingestor = Ingestor::new(
            Arc::new(PgStore::new(pool.clone())),
            Arc::new(PgIndexer::new(pool.clone())),
            mapper(config)?,
            IngestOptions::from_config(&config.ingest, initial),
        );
        let mut worker = HarvestWorker::new(SourceRecordLoader::new(client), ingestor);
        let gateway = gateway.clone();

        handles.push(tokio::spawn(async move {
            info!(worker_id, "Harvest worker started");
            worker.run(&gateway).await
        }));
    }

    let mut total = IngestStats::default();
    for result in futures::future::join_all(handles).await {
        let stats = result.context("Harvest worker panicked")??;
        total = total.merge(stats);
    }

    println!(
        "created: {}, replaced: {}, skipped: {}, rejected: {}, failed: {}, dropped: {}, warnings: {}, commits: {}",
        total.created,
        total.replaced,
        total.skipped,
        total.rejected,
        total.failed,
        total.dropped,
        total.warnings,
        total.commits
    );
    Ok(())
}

async fn record(config: &HarvesterConfig, bibid: &str) -> Result<()> {
    let client = CatalogClient::new(&config.catalog)?;
    let loader = SourceRecordLoader::new(client);
    let raw = loader.load_by_id(bibid).await?;

    let mapper = mapper(config)?;
    let links = LinkResolver::new(config.ingest.app_base_url.clone());
    let preview = transform_record(&raw, &mapper, &links).await;

    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}

async fn document(config: &HarvesterConfig, bibid: &str) -> Result<()> {
    let client = CatalogClient::new(&config.catalog)?;
    let raw = SourceRecordLoader::new(client).load_by_id(bibid).await?;
    let document = mapper(config)?.map(&raw.marc).await;

    println!("{}", serde_json::to_string_pretty(&[document])?);
    Ok(())
}

async fn export(config: &HarvesterConfig, kind: EntityKind, directory: &Path) -> Result<()> {
    let pool = connect(&config.database).await?;
    let store = PgStore::new(pool);
    let summary = export_records(&store, kind, directory).await?;

    println!(
        "{} records exported ({}) to {}",
        summary.count,
        kind.pid_type(),
        summary.path.display()
    );
    Ok(())
}

async fn max_id(config: &HarvesterConfig) -> Result<()> {
    let pool = connect(&config.database).await?;
    let store = PgStore::new(pool);
    match store.max_identifier(EntityKind::Document).await? {
        Some(max) => println!("{max}"),
        None => println!("No documents"),
    }
    Ok(())
}

async fn queue(config: &HarvesterConfig, command: QueueCommand) -> Result<()> {
    let pool = connect(&config.database).await?;
    let gateway = gateway(config, &pool);

    match command {
        QueueCommand::Init => {
            gateway.init().await?;
            println!("Queue {} initialized", gateway.names().queue);
        }
        QueueCommand::Purge => {
            let removed = gateway.purge().await?;
            println!("Queue {} purged ({removed} messages)", gateway.names().queue);
        }
        QueueCommand::Delete => {
            gateway.delete().await?;
            println!("Queue {} deleted", gateway.names().queue);
        }
    }
    Ok(())
}
