use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use cloudcache::api::{
    change_kind, format_api_error, ApiClient, EventRouter, ResourceActions, SyncOutcome,
};
use cloudcache::config::Config;
use cloudcache::{Action, Dispatcher, Filter, ResourceKind, ResourceStore, SessionMode, Stores};

/// Resource caches for the cloud console API
#[derive(Parser, Debug)]
#[command(name = "cloudcache", version, about, long_about = None)]
struct Args {
    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Console API root (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Organization to act in (overrides config)
    #[arg(short, long)]
    organization: Option<String>,

    /// Use a user session scoped to one organization
    #[arg(long)]
    user: bool,

    /// Write the overrides above to the config file
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List resource kinds
    Kinds,
    /// Fetch one page of a resource kind
    Sync {
        /// Resource kind, e.g. `instance`
        kind: String,
        /// Page to load
        #[arg(short, long, default_value_t = 0)]
        page: u64,
        /// Filter field as key=value (repeatable)
        #[arg(short, long = "filter", value_parser = parse_filter_arg)]
        filters: Vec<(String, String)>,
    },
    /// Feed newline-delimited JSON actions through fresh stores
    Replay {
        /// Action log; blank lines and lines starting with `#` are skipped
        file: PathBuf,
    },
    /// Resync every kind named by a `<kind>.change` event in a file
    Events {
        /// One JSON event per line; other event types are ignored
        file: PathBuf,
    },
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

fn parse_filter_arg(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty filter key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

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

    tracing::info!("cloudcache {} started with log level: {:?}", cloudcache::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudcache").join("cloudcache.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudcache").join("cloudcache.log");
    }
    PathBuf::from("cloudcache.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut config = Config::load();
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(org) = &args.organization {
        config.organization = Some(org.clone());
    }
    if args.user {
        config.session = SessionMode::User;
    }
    if args.save_config {
        config.save()?;
        tracing::info!("Saved config to {:?}", Config::config_path());
    }

    let result = match args.command {
        Command::Kinds => {
            print_kinds();
            Ok(())
        }
        Command::Sync {
            kind,
            page,
            filters,
        } => run_sync(&config, &kind, page, filters).await,
        Command::Replay { file } => run_replay(&config, &file),
        Command::Events { file } => run_events(&config, &file).await,
    };

    if let Err(err) = result {
        tracing::error!("{:#}", err);
        eprintln!("Error: {}", format_api_error(&err));
        std::process::exit(1);
    }

    Ok(())
}

fn print_kinds() {
    for kind in ResourceKind::ALL {
        println!(
            "{:<14} {:<14} {:<14} {}",
            kind.name(),
            kind.path(),
            kind.collection(),
            kind.display_name()
        );
    }
}

fn parse_kind(kind: &str) -> Result<ResourceKind> {
    ResourceKind::parse(kind).ok_or_else(|| {
        anyhow!(
            "Unknown resource kind `{}` (run `cloudcache kinds` for the list)",
            kind
        )
    })
}

/// Reject filter keys the kind's filter bar does not offer
fn validate_filter_keys(kind: ResourceKind, filters: &[(String, String)]) -> Result<()> {
    let fields = kind.filter_fields();
    if let Some((key, _)) = filters.iter().find(|(key, _)| !fields.contains(key)) {
        bail!(
            "`{}` is not a {} filter field (expected one of: {})",
            key,
            kind,
            fields.join(", ")
        );
    }
    Ok(())
}

async fn run_sync(
    config: &Config,
    kind: &str,
    page: u64,
    filters: Vec<(String, String)>,
) -> Result<()> {
    let kind = parse_kind(kind)?;
    validate_filter_keys(kind, &filters)?;
    let stores = Stores::new(Arc::new(Dispatcher::new()), config.store_options())?;
    let client = Arc::new(ApiClient::from_config(config)?);
    let actions = ResourceActions::new(
        client,
        stores.resource(kind).clone(),
        stores.dispatcher().clone(),
    );

    if !filters.is_empty() {
        let filter: Filter = filters
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        stores.dispatcher().dispatch(Action::Filter {
            kind,
            filter: Some(filter),
        })?;
    }

    // The first response supplies the count that bounds `page`
    actions.sync().await?;
    if page > 0 {
        actions.traverse(page).await?;
    }

    print_page(actions.store());
    Ok(())
}

fn print_page(store: &ResourceStore) {
    for item in store.items().iter() {
        println!("{:<28} {}", item.id, item.name().unwrap_or("-"));
    }
    println!(
        "{}: page {}/{} ({} total)",
        store.kind().collection(),
        store.page(),
        store.pages(),
        store.count()
    );
}

fn run_replay(config: &Config, file: &Path) -> Result<()> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let stores = Stores::new(Arc::new(Dispatcher::new()), config.store_options())?;

    let mut applied = 0;
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Line {}: invalid JSON", line_no + 1))?;
        let action =
            Action::from_wire(&value).with_context(|| format!("Line {}", line_no + 1))?;
        tracing::debug!("replay {}", action.action_type());
        stores.dispatcher().dispatch(action)?;
        applied += 1;
    }

    println!("{} actions applied", applied);
    for store in stores.resources() {
        if store.is_empty() && store.count() == 0 && store.filter().is_none() {
            continue;
        }
        println!(
            "{:<14} {:>4} items  page {}/{}  count {}  filter {}",
            store.kind().name(),
            store.len(),
            store.page(),
            store.pages(),
            store.count(),
            store
                .filter()
                .map(|f| Value::Object(f).to_string())
                .unwrap_or_else(|| "null".to_string())
        );
    }

    let completion = stores.completion();
    for (key, items) in completion.completion().iter() {
        if !items.is_empty() {
            println!("completion {:<14} {:>4} items", key, items.len());
        }
    }
    if let Some(org) = completion.user_organization() {
        println!("user organization: {}", org);
    }

    Ok(())
}

async fn run_events(config: &Config, file: &Path) -> Result<()> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let stores = Stores::new(Arc::new(Dispatcher::new()), config.store_options())?;
    let client = Arc::new(ApiClient::from_config(config)?);
    let router = EventRouter::for_stores(&client, &stores);

    let mut synced = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: Value = serde_json::from_str(line)
            .with_context(|| format!("Line {}: invalid JSON", line_no + 1))?;
        if router.handle(&event).await? == Some(SyncOutcome::Applied) {
            if let Some(kind) = change_kind(&event) {
                if !synced.contains(&kind) {
                    synced.push(kind);
                }
            }
        }
    }

    println!("{} kinds resynced", synced.len());
    for kind in synced {
        print_page(stores.resource(kind));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_arg() {
        assert_eq!(
            parse_filter_arg("name=web").unwrap(),
            ("name".to_string(), "web".to_string())
        );
        assert_eq!(
            parse_filter_arg("comment=a=b").unwrap(),
            ("comment".to_string(), "a=b".to_string())
        );
        assert!(parse_filter_arg("name").is_err());
        assert!(parse_filter_arg("=web").is_err());
    }

    #[test]
    fn test_validate_filter_keys() {
        let filters = vec![
            ("name".to_string(), "web".to_string()),
            ("node".to_string(), "n1".to_string()),
        ];
        assert!(validate_filter_keys(ResourceKind::Instance, &filters).is_ok());
        assert!(validate_filter_keys(ResourceKind::Instance, &[]).is_ok());

        let err = validate_filter_keys(ResourceKind::Zone, &filters).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("`node` is not a zone filter field"));
        assert!(message.contains("name, datacenter, comment"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "cloudcache",
            "--user",
            "sync",
            "instance",
            "--page",
            "2",
            "-f",
            "name=web",
        ])
        .unwrap();
        assert!(args.user);
        match args.command {
            Command::Sync {
                kind,
                page,
                filters,
            } => {
                assert_eq!(kind, "instance");
                assert_eq!(page, 2);
                assert_eq!(filters, vec![("name".to_string(), "web".to_string())]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
