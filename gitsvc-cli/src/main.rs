//! gitsvc CLI - Serve a mirrored git repository over HTTP

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gitsvc_core::config::CliOverrides;
use gitsvc_core::{Config, Secrets};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::ServeArgs;

/// gitsvc: mirror a git repository and serve its files over HTTP
#[derive(Parser, Debug)]
#[command(name = "gitsvc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/gitsvc/config.toml)
    #[arg(long, global = true, env = "GITSVC_CONFIG")]
    config: Option<PathBuf>,

    /// URL of the git repository
    #[arg(long, global = true, env = "GITSVC_URL")]
    url: Option<String>,

    /// Token for the git repository (overrides GITSVC_TOKEN and the secrets file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Path to the SSH key for authentication
    #[arg(long, global = true, env = "GITSVC_SSH_KEY")]
    ssh_key: Option<PathBuf>,

    /// Directory the repository is cloned into
    #[arg(long, global = true, env = "GITSVC_REPO_DIR")]
    repo_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone or update the repository, then serve it (default)
    Serve(ServeArgs),

    /// Show current configuration
    Config,

    /// Create a secrets file template
    InitSecrets,

    /// Show version information
    Version,
}

impl Cli {
    /// Command to run, `serve` when none is given, plus the flags that
    /// override the config file
    fn resolve(&mut self) -> (Commands, CliOverrides) {
        let command = self
            .command
            .take()
            .unwrap_or_else(|| Commands::Serve(ServeArgs::default()));

        let listen = match &command {
            Commands::Serve(args) => args.listen.clone(),
            _ => None,
        };
        let overrides = CliOverrides {
            url: self.url.clone(),
            ssh_key: self.ssh_key.clone(),
            repo_dir: self.repo_dir.clone(),
            listen,
        };

        (command, overrides)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let (command, overrides) = cli.resolve();
    let config = Config::load_with_overrides(cli.config.as_deref(), overrides)?;

    if cli.verbose {
        tracing::info!(
            url = ?config.remote.url,
            repo_dir = %config.storage.repo_dir.display(),
            listen = %config.server.listen,
            "Configuration loaded"
        );
    }

    match command {
        Commands::Serve(args) => {
            let secrets = Secrets::load()?;
            let token = secrets.token(cli.token.as_deref());
            args.execute(&config, token).await?;
        }
        Commands::Config => {
            println!("gitsvc Configuration");
            println!("====================");
            println!();
            println!("Remote:");
            println!("  url: {}", config.remote.url.as_deref().unwrap_or("(not set)"));
            println!(
                "  ssh_key: {}",
                config
                    .remote
                    .ssh_key
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(default)".to_string())
            );
            println!("Storage:");
            println!("  repo_dir: {}", config.storage.repo_dir.display());
            println!("Server:");
            println!("  listen: {}", config.server.listen);
            println!();
            print_file_status("Config file", cli.config.or_else(Config::default_config_path));
            print_file_status("Secrets file", Secrets::default_secrets_path());
        }
        Commands::InitSecrets => {
            let path = Secrets::create_template()?;
            println!("Created {}", path.display());
        }
        Commands::Version => {
            println!("gitsvc {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn print_file_status(label: &str, path: Option<PathBuf>) {
    if let Some(path) = path {
        println!("{}: {}", label, path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found)");
        }
    }
}
