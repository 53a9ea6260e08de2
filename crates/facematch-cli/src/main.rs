mod commands;
mod config;
mod files;
mod render;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use commands::{Context, Output};
use config::{CredentialSources, Settings, TerminalPrompt};
use facematch_client::{ClientConfig, FaceClient};
use facematch_core::MatchPolicy;
use render::Renderer;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "facematch", about = "Detect and match faces with a cloud face service")]
struct Cli {
    /// Face API subscription key
    #[arg(long, global = true)]
    key: Option<String>,
    /// Face API endpoint, e.g. https://westus.api.cognitive.microsoft.com
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// File holding the subscription key and endpoint
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,
    /// Write annotated images into this directory
    #[arg(long, global = true)]
    save: Option<PathBuf>,
    /// TrueType font for labels and captions
    #[arg(long, global = true)]
    font: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect faces and describe their attributes
    Detect {
        /// Image URL, file, or a directory of images
        path: String,
    },
    /// Find the faces of the target photo in the candidate photo
    Similar {
        /// Photo with the faces to look for
        target: String,
        /// Photo to search in
        candidate: String,
        /// Leave a target face unmatched when its query fails
        #[arg(long)]
        skip_failed: bool,
    },
    /// Run detection and recognition on the bundled sample photos
    Demo {
        #[arg(long, default_value = "photo/detection")]
        detect_dir: String,
        #[arg(long, default_value = "photo/PersonGroup/Family1-Dad-Bill/Family1-Dad1.jpg")]
        target: String,
        #[arg(long, default_value = "photo/identification/identification1.jpg")]
        candidate: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    let sources = CredentialSources {
        key: cli.key,
        endpoint: cli.endpoint,
        key_file: cli.key_file,
    }
    .with_env_fallback();
    let credentials =
        config::resolve_credentials(sources, &config::default_key_file(), &mut TerminalPrompt)?;

    let mut client_config = ClientConfig::new(credentials.endpoint, credentials.key);
    client_config.timeout = Duration::from_secs(settings.timeout_secs);
    client_config.max_candidates = settings.max_candidates;
    let client = FaceClient::new(&client_config)?;

    let output = match cli.save {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
            let font = cli.font.or(settings.font_path);
            Some(Output { dir, renderer: Renderer::new(font.as_deref()) })
        }
        None => None,
    };

    let mut ctx = Context {
        client,
        output,
        json: cli.json,
        policy: MatchPolicy::FailFast,
    };

    match cli.command {
        Commands::Detect { path } => commands::run_detect(&ctx, &path).await,
        Commands::Similar { target, candidate, skip_failed } => {
            if skip_failed {
                ctx.policy = MatchPolicy::SkipFailed;
            }
            commands::run_similar(&ctx, &target, &candidate).await
        }
        Commands::Demo { detect_dir, target, candidate } => {
            commands::demo(&ctx, &detect_dir, &target, &candidate).await
        }
    }
}
