use clap::{Parser, Subcommand};
use quire::config::{self, ServerConfig};
use quire::mirror::{ConfirmDrift, DriftPolicy, Mirrors};
use quire::query::Catalog;
use quire::refresh::Refresher;
use quire::{http, index, output, store};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Documentation server for markdown repositories")]
#[command(long_about = "\
Documentation server for markdown repositories

Articles live in git repositories or local directories, one subdirectory per
language. quire mirrors them, indexes them, publishes the index to a cache
and serves it as JSON.

Content structure:

  articles/
  ├── stories.toml             # Optional story manifest
  ├── en/
  │   ├── install.md           # Title: Installation
  │   │                        # Description: ...
  │   │                        #
  │   │                        # markdown body
  │   └── intro.md
  └── it/
      └── install.md

Without language directories every article gets the fallback language.

Run 'quire gen-config' to generate a documented quire.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: quire.toml, config/quire.toml, /etc/quire/quire.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync, index and serve the configured repositories
    Serve {
        /// Override the listen address from the config
        #[arg(long)]
        listen: Option<String>,
        /// Replace mirrors whose origin changed without asking
        #[arg(long)]
        force: bool,
    },
    /// Index the configured repositories without syncing or serving
    Check,
    /// Print a stock quire.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { listen, force } => {
            let config = config::discover_config(cli.config.as_deref())?;
            let listen = listen.unwrap_or_else(|| config.listen.clone());
            serve(config, &listen, force).await?;
        }
        Command::Check => {
            let config = config::discover_config(cli.config.as_deref())?;
            check(&config).await?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

async fn serve(
    config: ServerConfig,
    listen: &str,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = store::open_store(&config.cache).await?;

    let policy = if force {
        DriftPolicy::Force
    } else {
        DriftPolicy::Ask(Arc::new(TerminalConfirm))
    };
    let handle = Refresher::new(&config, Arc::clone(&store))
        .start(policy)
        .await?;
    match handle.primed() {
        Some(report) => tracing::info!(%report, "content ready"),
        None => tracing::warn!("serving without a freshly published snapshot"),
    }

    let app = http::router(Catalog::new(store));
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!("HTTP server listening on {}", listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(stats = %handle.stats(), "shutting down");
    Ok(())
}

/// Index what is already on disk and print the inventory.
async fn check(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mirrors = Mirrors::new(&config.mirrors_dir);
    let sources = config.sources(&mirrors);
    for source in &sources {
        println!("==> Checking {} ({})", source.id, source.content_root().display());
    }
    let repos = tokio::task::spawn_blocking(move || index::index_all(&sources)).await??;
    output::print_index_output(&repos);
    println!("==> Content is valid");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Asks on the terminal before discarding a mirror whose origin changed.
struct TerminalConfirm;

impl ConfirmDrift for TerminalConfirm {
    fn confirm_overwrite(&self, mirror: &Path, configured: &str, found: &str) -> bool {
        let mut stdout = std::io::stdout();
        let _ = write!(
            stdout,
            "Mirror {} points to {found}, but the config says {configured}.\n\
             Delete it and clone again? [y/N] ",
            mirror.display()
        );
        let _ = stdout.flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}
