use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pkg_cluster::{ClusterApi, RegistryClient, RemoteCache};
use pkg_constants::paths::{DEFAULT_DATA_DIR, DEFAULT_DEVPOD_CONFIG};
use pkg_constants::state::{DEFAULT_CACHE_NAME, DEFAULT_NAMESPACE};
use pkg_controllers::devpod::DevPodController;
use pkg_controllers::podreplace::{PodReplacer, ReplaceContext, Replacer, ReplacerOptions};
use pkg_state::StateStore;
use pkg_types::config::{DevConfigFile, load_config_file};

#[derive(Parser, Debug)]
#[command(name = "k3rs-devpod", about = "Replace workload pods with development pods")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_DEVPOD_CONFIG)]
    config: String,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,

    /// Namespace used by dev pods that don't name one
    #[arg(long, short)]
    namespace: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace the pods of a dev pod's target workload
    Replace {
        /// Dev pod name from the config file
        name: String,
    },
    /// Restore the original workload of a dev pod
    Revert {
        /// Dev pod name; reverts every recorded dev pod when omitted
        name: Option<String>,
    },
    /// List recorded replacements
    List,
    /// Keep all configured dev pods replaced until interrupted
    Watch {
        /// Seconds between reconcile passes
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    // Load config file (returns defaults if file not found)
    let file_cfg: DevConfigFile = load_config_file(&cli.config)
        .with_context(|| format!("failed to load config file {}", cli.config))?;
    file_cfg.validate()?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let namespace = cli
        .namespace
        .clone()
        .or_else(|| file_cfg.namespace.clone())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| file_cfg.data_dir.clone())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    let cache_name = file_cfg
        .cache_name
        .clone()
        .unwrap_or_else(|| DEFAULT_CACHE_NAME.to_string());

    info!("  Namespace: {}", namespace);
    info!("  Data dir:  {}", data_dir);
    info!("  Dev pods:  {}", file_cfg.dev_pods.len());

    let store = StateStore::new(&data_dir).await?;
    let client: Arc<dyn ClusterApi> =
        Arc::new(RegistryClient::new(store.clone(), namespace.clone()));
    let cache = RemoteCache::load(client.as_ref(), &namespace, &cache_name)
        .await
        .context("failed to load dev pod cache")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            let _ = cancel_tx.send(true);
        }
    });
    let ctx = ReplaceContext::new(client, cache).with_cancel(cancel_rx);
    let replacer = Replacer::new(ReplacerOptions::default());

    match cli.command {
        Commands::Replace { name } => {
            let dev_pod = file_cfg
                .dev_pod(&name)
                .with_context(|| format!("dev pod '{}' is not declared in {}", name, cli.config))?;
            let outcome = replacer.replace_pod(&ctx, dev_pod).await?;
            println!("{}: {}", name, outcome);
        }
        Commands::Revert { name } => {
            let entries = match name {
                Some(name) => vec![
                    ctx.cache
                        .get_dev_pod(&name)
                        .with_context(|| format!("no replacement recorded for dev pod '{}'", name))?,
                ],
                None => ctx.cache.dev_pods(),
            };
            for entry in entries {
                if replacer.revert_replace_pod(&ctx, &entry).await? {
                    println!("{}: reverted", entry.name);
                } else {
                    println!("{}: nothing to revert", entry.name);
                }
            }
        }
        Commands::List => {
            println!(
                "{:<20} {:<12} {:<28} {:<32} {:<10}",
                "DEV POD", "KIND", "TARGET", "REPLICA SET", "PHASE"
            );
            for entry in ctx.cache.dev_pods() {
                println!(
                    "{:<20} {:<12} {:<28} {:<32} {:<10}",
                    entry.name,
                    entry.target_kind,
                    format!("{}/{}", entry.namespace, entry.target_name),
                    entry.replica_set,
                    format!("{:?}", entry.phase)
                );
            }
        }
        Commands::Watch { interval } => {
            let controller = DevPodController::new(ctx, file_cfg.dev_pods.clone())
                .with_interval(Duration::from_secs(interval.max(1)));
            controller.start().await?;
        }
    }

    store.close().await?;
    Ok(())
}
