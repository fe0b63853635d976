use crate::classify::Classification;
use crate::config::RouterConfig;
use crate::dispatcher::Dispatcher;
use crate::hot_reload::watch_spec_root;
use crate::server::{AppService, HttpServer, DEFAULT_WORKERS};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for specroute
#[derive(Parser, Debug)]
#[command(name = "specroute")]
#[command(about = "Specification-driven pre-router", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the APIs under the configured specification root
    Serve {
        /// Router configuration file (YAML or TOML)
        #[arg(short, long, env = "SPECROUTE_CONFIG")]
        config: PathBuf,

        /// Address and port to bind the server to
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        /// Invalidate API versions as soon as their files change
        #[arg(long, default_value_t = false)]
        watch: bool,

        /// Number of HTTP worker threads
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },
    /// Print how a request URI is classified
    Classify {
        #[arg(short, long, env = "SPECROUTE_CONFIG")]
        config: PathBuf,

        /// Full request URI, including the server address
        uri: String,
    },
    /// Print the routes registered for one API version
    Routes {
        #[arg(short, long, env = "SPECROUTE_CONFIG")]
        config: PathBuf,

        #[arg(long)]
        api: String,

        #[arg(long)]
        version: String,
    },
}

fn load_config(path: &Path) -> Result<RouterConfig> {
    let config = RouterConfig::from_file(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Parse the process arguments and execute the chosen command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a specification
/// fails to load or register, or the server fails to start.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    execute(cli, &mut std::io::stdout())
}

/// Execute `cli`, writing command output to `out`.
pub fn execute(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            addr,
            watch,
            workers,
        } => serve(&config, &addr, watch, workers),
        Commands::Classify { config, uri } => {
            let config = load_config(&config)?;
            match crate::classify::classify(&config, &uri)? {
                Classification::Api { api_name, version } => {
                    writeln!(out, "api api_name={api_name} version={version}")?;
                }
                Classification::Spec {
                    api_name,
                    version,
                    spec_file,
                } => {
                    writeln!(
                        out,
                        "spec api_name={api_name} version={version} spec_file={spec_file}"
                    )?;
                }
                Classification::None => writeln!(out, "none")?,
            }
            Ok(())
        }
        Commands::Routes {
            config,
            api,
            version,
        } => {
            let dispatcher = Dispatcher::from_config(load_config(&config)?)?;
            let routes = dispatcher
                .describe_routes(&api, &version)
                .with_context(|| format!("building routes for {api}/{version}"))?;
            for route in routes {
                writeln!(
                    out,
                    "{} {} -> {}",
                    route.verb.as_str().to_ascii_uppercase(),
                    route.path,
                    route.handler_name
                )?;
            }
            Ok(())
        }
    }
}

fn serve(config: &Path, addr: &str, watch: bool, workers: usize) -> Result<()> {
    let dispatcher = Arc::new(Dispatcher::from_config(load_config(config)?)?);
    let _watcher = if watch {
        Some(
            watch_spec_root(dispatcher.spec_root().to_path_buf(), Arc::clone(&dispatcher))
                .context("starting specification watcher")?,
        )
    } else {
        None
    };

    let service = AppService::new(Arc::clone(&dispatcher))?;
    let handle = HttpServer::new(service)
        .with_workers(workers)
        .start(addr)
        .with_context(|| format!("binding {addr}"))?;

    wait_for_shutdown()?;
    info!("Shutdown signal received");
    handle.stop();
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown() -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Received termination signal");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> Result<()> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(())
}
