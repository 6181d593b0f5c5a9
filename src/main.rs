//! jsondb - operator CLI for a path-addressable JSON store

use clap::{Parser, Subcommand};
use jsondb::{Config, GetOptions, Index, JsonDb, Order, SqlJsonDb};
use std::io::Read;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "jsondb")]
#[command(about = "Path-addressable JSON document store over SQLite")]
struct Args {
    /// Path to SQLite database
    #[arg(long, env = "JSONDB_DATABASE_PATH", default_value = "./jsondb.db")]
    database: String,

    /// Log level
    #[arg(long, env = "JSONDB_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Use WAL journaling
    #[arg(
        long,
        env = "JSONDB_WAL_MODE",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    wal_mode: bool,

    /// Disable WAL journaling, whatever --wal-mode says
    #[arg(long)]
    no_wal: bool,

    /// SQLite busy timeout in milliseconds
    #[arg(long, env = "JSONDB_BUSY_TIMEOUT_MS", default_value = "5000")]
    busy_timeout_ms: u32,

    /// Per-operation deadline in milliseconds
    #[arg(long, env = "JSONDB_OP_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Declared index as collection#field (repeatable or comma-separated)
    #[arg(long = "index", env = "JSONDB_INDEXES", value_delimiter = ',')]
    indexes: Vec<String>,

    /// Collection read back as an array (repeatable or comma-separated)
    #[arg(long = "list-collection", env = "JSONDB_LIST_COLLECTIONS", value_delimiter = ',')]
    list_collections: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the store tables (idempotent)
    CreateTables,
    /// Drop the store tables (idempotent)
    DropTables,
    /// Print the document at a path
    Get {
        path: String,
        /// Maximum nesting depth (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        depth: usize,
        #[arg(long)]
        start_at: Option<String>,
        #[arg(long)]
        start_after: Option<String>,
        #[arg(long)]
        end_at: Option<String>,
        #[arg(long)]
        end_before: Option<String>,
        /// Return children in descending key order
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        pretty: bool,
    },
    /// Replace the document at a path (JSON from argument or stdin)
    Set { path: String, json: Option<String> },
    /// Merge a JSON object into the document at a path
    Update { path: String, json: Option<String> },
    /// Write a document only if the path is empty
    Create { path: String, json: Option<String> },
    /// Store a document under a generated key and print the key
    Push { path: String, json: Option<String> },
    /// Remove the document at a path
    Delete { path: String },
    /// Check whether anything is stored at a path
    Exists { path: String },
    /// List documents of a collection whose field equals a value
    Lookup {
        collection: String,
        field: String,
        value: String,
    },
    /// Print a newly generated key
    Key,
    /// Print row and index statistics
    Stats,
    /// Reclaim free pages (VACUUM)
    Compact,
}

impl Args {
    /// Store configuration described by the flags and environment
    fn config(&self) -> anyhow::Result<Config> {
        Ok(Config {
            database_path: self.database.clone(),
            log_level: self.log_level.clone(),
            wal_mode: self.wal_mode && !self.no_wal,
            busy_timeout_ms: self.busy_timeout_ms,
            op_timeout_ms: self.timeout_ms,
            indexes: self
                .indexes
                .iter()
                .map(|spec| Index::parse(spec))
                .collect::<Result<_, _>>()?,
            list_collections: self.list_collections.clone(),
        })
    }
}

fn payload(json: Option<String>) -> anyhow::Result<Vec<u8>> {
    match json {
        Some(text) => Ok(text.into_bytes()),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging (stderr keeps stdout for documents)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.config()?;

    tracing::debug!(path = %config.database_path, "opening store");
    let db = SqlJsonDb::open(&config)?;

    match args.command {
        Command::CreateTables => db.create_tables()?,
        Command::DropTables => db.drop_tables()?,
        Command::Get {
            path,
            depth,
            start_at,
            start_after,
            end_at,
            end_before,
            desc,
            limit,
            pretty,
        } => {
            let options = GetOptions {
                depth,
                start_at,
                start_after,
                end_at,
                end_before,
                order: if desc { Order::Desc } else { Order::Asc },
                limit_to_first: limit,
                pretty_print: pretty,
                callback: None,
            };
            match db.get_as_string(&path, &options)? {
                Some(document) => println!("{document}"),
                None => return Ok(ExitCode::FAILURE),
            }
        }
        Command::Set { path, json } => db.set(&path, &payload(json)?)?,
        Command::Update { path, json } => db.update(&path, &payload(json)?)?,
        Command::Create { path, json } => db.create(&path, &payload(json)?)?,
        Command::Push { path, json } => println!("{}", db.push(&path, &payload(json)?)?),
        Command::Delete { path } => {
            if !db.delete(&path)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Exists { path } => {
            let found = db.exists(&path)?;
            println!("{found}");
            if !found {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Lookup {
            collection,
            field,
            value,
        } => {
            for id in db.fetch_ids_by_property_value(&collection, &field, &value)? {
                println!("{id}");
            }
        }
        Command::Key => println!("{}", db.create_key()),
        Command::Stats => {
            let stats = db.stats()?;
            println!("rows: {}", stats.row_count);
            match stats.schema_version {
                Some(version) => println!("schema version: {version}"),
                None => println!("schema version: none"),
            }
            for (table, entries) in stats.index_entries {
                println!("{table}: {entries}");
            }
        }
        Command::Compact => db.compact()?,
    }

    Ok(ExitCode::SUCCESS)
}
