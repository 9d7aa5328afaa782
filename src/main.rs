/// Version injected at compile time via LAPI_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("LAPI_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::{StreamExt, TryStreamExt};
use lapi::{format_api_error, ApiClient, ClientConfig, Filter, ParentId};
use serde_json::Value;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the cloud REST API
#[derive(Parser, Debug)]
#[command(name = "lapi", version = VERSION, about, long_about = None)]
struct Args {
    /// API token (overrides config file and LAPI_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// API root URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one resource
    Get {
        /// Resource type, e.g. instances
        kind: String,
        id: String,
        /// Parent id of a nested resource (repeat for deeper nesting)
        #[arg(long = "parent")]
        parents: Vec<String>,
        /// Print only this field
        #[arg(long)]
        field: Option<String>,
    },
    /// List resources of a type
    List {
        kind: String,
        #[arg(long = "parent")]
        parents: Vec<String>,
        /// Filter clause `field=value` (repeatable, all must match)
        #[arg(long = "where")]
        clauses: Vec<String>,
        #[arg(long)]
        order_by: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// List known resource types
    Types,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("lapi {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("lapi").join("lapi.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".lapi").join("lapi.log");
    }
    PathBuf::from("lapi.log")
}

/// Ids given on the command line are numbers when they parse as one
fn parse_id(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parent_id(parents: &[String]) -> Option<ParentId> {
    if parents.is_empty() {
        None
    } else {
        Some(ParentId::nested(parents.iter().map(|p| parse_id(p))))
    }
}

fn build_filter(
    client: &ApiClient,
    kind: &str,
    clauses: &[String],
    order_by: Option<&str>,
    desc: bool,
    limit: Option<i64>,
) -> Result<Filter> {
    let def = client.registry().get(kind)?;
    let fields = def.fields();
    let mut filter = Filter::new();

    for clause in clauses {
        let Some((name, raw)) = clause.split_once('=') else {
            bail!("Invalid --where '{}', expected field=value", clause);
        };
        // Bare words are strings; numbers, booleans and null keep their JSON type
        let value = serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|v| !v.is_object() && !v.is_array())
            .unwrap_or_else(|| Value::String(raw.to_string()));
        filter = filter.and(fields.get(name.trim())?.eq(value)?)?;
    }
    if let Some(name) = order_by {
        filter = filter.order_by(&fields.get(name)?, desc)?;
    }
    if let Some(n) = limit {
        filter = filter.limit(n)?;
    }

    Ok(filter)
}

async fn run(args: Args) -> Result<()> {
    let mut config = ClientConfig::load().context("Failed to load configuration")?;
    if let Some(token) = args.token {
        config.token = Some(token);
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    let client = ApiClient::new(&config).context("Failed to create API client")?;

    match args.command {
        Command::Types => {
            for key in client.registry().keys() {
                let def = client.registry().get(key)?;
                println!("{:<24} {}", key, def.endpoint);
            }
        },
        Command::Get {
            kind,
            id,
            parents,
            field,
        } => {
            let mut resource =
                client.construct(&kind, parse_id(&id), parent_id(&parents), None)?;
            let output = match field {
                Some(name) => resource.get(&name).await?.to_json(),
                None => {
                    resource.refresh().await?;
                    resource.raw_json().cloned().unwrap_or(Value::Null)
                },
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        },
        Command::List {
            kind,
            parents,
            clauses,
            order_by,
            desc,
            limit,
        } => {
            let filter = build_filter(&client, &kind, &clauses, order_by.as_deref(), desc, limit)?;
            let mut list = match parent_id(&parents) {
                Some(parent) => client.list_derived(&kind, parent, Some(&filter)).await?,
                None => client.list(&kind, Some(&filter)).await?,
            };

            let max = limit.map_or(usize::MAX, |n| n.max(0) as usize);
            let items: Vec<Value> = list
                .stream()
                .take(max)
                .map_ok(|resource| resource.raw_json().cloned().unwrap_or(Value::Null))
                .try_collect()
                .await?;
            println!("{}", serde_json::to_string_pretty(&Value::Array(items))?);
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    if let Err(err) = run(args).await {
        tracing::error!("Command failed: {:?}", err);
        match err.downcast_ref::<lapi::Error>() {
            Some(api_err) => eprintln!("Error: {}", format_api_error(api_err)),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }

    Ok(())
}
