use std::io::IsTerminal;

use clap::{Parser, Subcommand};
use cliclack::{confirm, intro, note, outro};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod batch;
mod config;
mod credentials;
mod error;
mod populate;
mod remote;
mod youtube;

use config::Config;
use credentials::Credentials;
use populate::Populator;

#[derive(Parser, Debug)]
struct Cli {
    /// The command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config(config::ConfigArgs),
    /// Create the playlists described in the input file and fill them
    Run {
        /// Input file to read instead of the configured one
        #[clap(short = 'i', long, value_name = "PATH")]
        input: Option<String>,
        /// Description for the created playlists
        #[clap(short = 'd', long, value_name = "TEXT")]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    // Already installed is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => handle_config(args)?,
        Commands::Run { input, description } => handle_run(input, description).await?,
    }

    Ok(())
}

fn handle_config(args: config::ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    intro("📝 Configuration")?;

    let mut cfg = Config::read().unwrap_or_default();

    if args.reset {
        let confirmed = confirm("Are you sure you want to reset the configuration?").interact()?;

        if confirmed {
            cfg = Config::default();
            cfg.write()?;
            outro("✅ Configuration reset successfully")?;
        }
        return Ok(());
    }

    if cfg.apply(&args) {
        cfg.write()?;
        outro("✅ Configuration saved")?;
    }

    if args.list {
        note(
            "OAuth2 client secret",
            cfg.client_secret.as_deref().unwrap_or("<not set>"),
        )?;
        note("Input file", &cfg.input_file)?;
        note("Token cache", cfg.token_cache_path()?.display())?;
        note("Scopes", cfg.scopes.join("\n"))?;
        note(
            "Playlist description",
            if cfg.description.is_empty() {
                "<empty>"
            } else {
                cfg.description.as_str()
            },
        )?;

        outro("✅ Configuration listing completed")?;
    }

    Ok(())
}

async fn handle_run(
    input: Option<String>,
    description: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    intro("🎵 Populating playlists")?;

    let mut cfg = Config::read()?;
    if let Some(input) = input {
        cfg.input_file = input;
    }
    if let Some(description) = description {
        cfg.description = description;
    }

    let credentials = match Credentials::from_config(&cfg) {
        Ok(credentials) => credentials,
        Err(e) => {
            outro(format!(
                "❌ {e}. Set it with `playseed config --client-secret <PATH>`."
            ))?;
            return Err(e.into());
        }
    };

    let client = match credentials.authenticate().await {
        Ok(client) => client,
        Err(e) => {
            outro(format!("❌ {e}"))?;
            return Err(e.into());
        }
    };

    if let Err(e) = Populator::new(&client, &cfg).run().await {
        outro(format!("❌ Error: {e}"))?;
        return Err(e.into());
    }

    outro("✅ Done")?;
    Ok(())
}
