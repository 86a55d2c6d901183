//! CLI entry point for sp-autocopy.
//!
//! This binary keeps a SharePoint farm's files in sync with their project
//! sources: every time a template or root file is saved it is copied to its
//! deployment location, with `$SharePoint.*$` tokens replaced.
//!
//! The open projects are described by a JSON manifest (see
//! [`manifest`]). The manifest itself is watched too, so adding or removing
//! files there takes effect immediately.
//!
//! # Usage
//!
//! ```bash
//! sp-autocopy [OPTIONS] <COMMAND>
//!
//! # Watch and deploy on save
//! sp-autocopy watch --manifest ./sp-autocopy.json
//!
//! # Show the content tokens of each project
//! sp-autocopy tokens --format json
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod manifest;

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use manifest::ManifestHost;
use serde::Serialize;
use spd_core::{AssemblyInspector, BuildEvaluator, Config, ProjectModel};
use spd_deploy::{
    ContentTokenCache, DeployStatsSnapshot, DeploymentWriter, ExtensionPolicyCache,
    PathTokenResolver, WatchRegistry,
};
use spd_watcher::{FileEventBatch, FileNotifier, NotifyFileNotifier};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Copies SharePoint project files to their deployment location on save.
#[derive(Parser)]
#[command(name = "sp-autocopy", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Path to the project manifest.
    #[arg(
        short,
        long,
        global = true,
        env = "SPD_MANIFEST",
        default_value = "sp-autocopy.json"
    )]
    manifest: Utf8PathBuf,

    /// Path to a JSON configuration file.
    ///
    /// Every setting has a default, so this is optional.
    #[arg(short, long, global = true, env = "SPD_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Watch project files and deploy them when they are saved.
    Watch {
        /// Debounce window in milliseconds (overrides the configuration).
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Print the content tokens of each project.
    Tokens {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Output format of the `tokens` command.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One line per token.
    Text,
    /// JSON document.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Loads the configuration file, or the defaults if none was given.
fn load_config(path: Option<&Utf8Path>) -> color_eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let config = Config::from_json_file(path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load configuration {}: {}", path, e))?;
    info!(path = %path, "Configuration loaded");
    Ok(config)
}

/// Loads the project manifest.
fn load_manifest(path: &Utf8Path) -> color_eyre::Result<Arc<ManifestHost>> {
    let host = ManifestHost::load(path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load manifest {}: {}", path, e))?;
    info!(
        path = %host.path(),
        projects = host.projects().len(),
        "Manifest loaded"
    );
    Ok(Arc::new(host))
}

/// Builds the deployment writer over the manifest host.
fn build_writer(config: &Config, host: &Arc<ManifestHost>) -> DeploymentWriter {
    DeploymentWriter::new(
        PathTokenResolver::from_config(&config.deploy, &host.sharepoint_install_path()),
        ExtensionPolicyCache::new(
            Arc::clone(host) as Arc<dyn BuildEvaluator>,
            config.deploy.token_extensions_property.clone(),
        ),
        ContentTokenCache::new(Arc::clone(host) as Arc<dyn AssemblyInspector>),
    )
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Watches every eligible file until interrupted.
///
/// # Errors
///
/// Returns an error if the notifier cannot be created or the manifest
/// cannot be watched.
async fn run_watch(config: Config, host: Arc<ManifestHost>) -> color_eyre::Result<()> {
    let notifier = Arc::new(NotifyFileNotifier::new(&config.watch)?);
    let registry = WatchRegistry::new(
        Arc::clone(&host) as Arc<dyn ProjectModel>,
        Arc::clone(&notifier) as Arc<dyn FileNotifier>,
        build_writer(&config, &host),
    );

    let watched = registry.initialize();
    info!(watched, manifest = %host.path(), "Watching for changes");

    let (tx, mut manifest_saved) = mpsc::unbounded_channel();
    let manifest_watch = notifier.subscribe(
        host.path(),
        Arc::new(move |_: &FileEventBatch| {
            let _ = tx.send(());
        }),
    )?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            Some(()) = manifest_saved.recv() => apply_manifest_change(&host, &registry),
        }
    }

    if let Err(error) = notifier.unsubscribe(manifest_watch) {
        debug!(error = %error, "Manifest unsubscribe failed");
    }
    registry.shutdown();
    print_stats_summary(&registry.stats())?;
    Ok(())
}

/// Resolves when the process is asked to stop.
async fn shutdown_signal() -> color_eyre::Result<()> {
    // Handle SIGTERM for graceful shutdown on Unix
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Interrupted, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Interrupted, shutting down");
    }

    Ok(())
}

/// Applies a saved manifest to the watch set.
///
/// Cached project metadata that changed is dropped, then the watch set is
/// resynchronized against the reloaded projects. Resync picks up files whose
/// deployment type changed as well as added and removed ones.
fn apply_manifest_change(host: &ManifestHost, registry: &WatchRegistry) {
    let changes = match host.reload() {
        Ok(changes) => changes,
        Err(error) => {
            warn!(
                path = %host.path(),
                error = %error,
                "Cannot reload manifest, keeping previous projects"
            );
            return;
        }
    };
    if changes.is_empty() {
        debug!("Manifest saved without changes");
        return;
    }

    let writer = registry.writer();
    for id in &changes.stale_projects {
        writer.extensions().invalidate(*id);
        writer.tokens().invalidate(*id);
    }
    let summary = registry.resync();

    info!(
        added = changes.added_files.len(),
        removed = changes.removed_files.len(),
        reclassified = changes.reclassified_files.len(),
        stale = changes.stale_projects.len(),
        watched = registry.len(),
        failed = summary.failed,
        "Manifest reloaded"
    );
}

/// One project's content tokens.
#[derive(Debug, Serialize)]
struct ProjectTokens {
    project: String,
    built: bool,
    tokens: Vec<TokenValue>,
}

/// A token and its value.
#[derive(Debug, Serialize)]
struct TokenValue {
    token: String,
    value: String,
}

/// Prints the content token table of each project.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
fn run_tokens(host: &Arc<ManifestHost>, format: OutputFormat) -> color_eyre::Result<()> {
    let cache = ContentTokenCache::new(Arc::clone(host) as Arc<dyn AssemblyInspector>);
    let reports = collect_tokens(&**host, &cache);

    let content = match format {
        OutputFormat::Text => format_tokens_text(&reports),
        OutputFormat::Json => serde_json::to_string_pretty(&reports)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))?,
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{content}")?;
    Ok(())
}

fn collect_tokens(model: &dyn ProjectModel, cache: &ContentTokenCache) -> Vec<ProjectTokens> {
    model
        .projects()
        .iter()
        .map(|project| {
            let table = cache.get_tokens(project.as_ref());
            ProjectTokens {
                project: project.name().to_owned(),
                built: !table.is_empty(),
                tokens: table
                    .iter()
                    .map(|(token, value)| TokenValue {
                        token: token.to_owned(),
                        value: value.to_owned(),
                    })
                    .collect(),
            }
        })
        .collect()
}

fn format_tokens_text(reports: &[ProjectTokens]) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    for report in reports {
        if report.built {
            let _ = writeln!(output, "{}", report.project);
        } else {
            let _ = writeln!(output, "{} (not built)", report.project);
        }
        for entry in &report.tokens {
            let _ = writeln!(output, "  {} = {}", entry.token, entry.value);
        }
    }
    output
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints a summary of what was deployed during the session.
fn print_stats_summary(stats: &DeployStatsSnapshot) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle)?;
    writeln!(handle, "Deployment Summary")?;
    writeln!(handle, "==================")?;
    writeln!(handle, "  Substituted:      {}", stats.substituted)?;
    writeln!(handle, "  Copied:           {}", stats.copied)?;
    writeln!(handle, "  Failed:           {}", stats.failed)?;
    writeln!(handle, "  Watches pruned:   {}", stats.pruned)?;
    writeln!(handle, "  Events ignored:   {}", stats.ignored)?;
    writeln!(handle, "  Watches refused:  {}", stats.rejected)?;
    writeln!(handle, "Success rate: {:.1}%", stats.success_rate())?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load the manifest every command works from
    let host = load_manifest(&cli.manifest)?;

    // 5. Route to appropriate command
    match cli.command {
        Commands::Watch { debounce_ms } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(debounce_ms) = debounce_ms {
                config.watch.debounce_ms = debounce_ms;
            }
            run_watch(config, host).await
        }
        Commands::Tokens { format } => run_tokens(&host, format),
    }
}
