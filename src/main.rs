//! # Midiator CLI
//!
//! Command-line interface for batch image synthesis.
//!
//! ## Usage
//!
//! ```bash
//! # Render one PNG per record into ./out
//! midiator generate --background card.png --records people.json --layout layout.json --out out
//!
//! # Use fonts from a directory
//! midiator generate --font-dir ./fonts --background card.png --records people.json --layout layout.json
//!
//! # Serve the HTTP API
//! midiator serve --listen 0.0.0.0:8080
//! ```
//!
//! Set `RUST_LOG` to change log verbosity (default `midiator=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use midiator::{
    MidiatorError,
    batch::BatchGenerator,
    config::{ServerConfig, SynthConfig},
    download,
    model::{self, FieldLayout},
    server::{self, AppState},
};

/// Midiator - render tabular records onto a background image
#[derive(Parser, Debug)]
#[command(name = "midiator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (fonts, default family, download stagger)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Extra directory of .ttf/.otf fonts (repeatable)
    #[arg(long = "font-dir", global = true, value_name = "DIR")]
    font_dirs: Vec<PathBuf>,

    /// Family used when a field's font is unavailable
    #[arg(long, global = true)]
    default_family: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one PNG per record and save them to a directory
    Generate {
        /// Background image (PNG, JPEG, ...)
        #[arg(long, value_name = "FILE")]
        background: PathBuf,

        /// Records: JSON array of objects
        #[arg(long, value_name = "FILE")]
        records: PathBuf,

        /// Field layout: JSON { positions, styles }
        #[arg(long, value_name = "FILE")]
        layout: PathBuf,

        /// Output directory
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Delay between written files in milliseconds
        #[arg(long)]
        stagger_ms: Option<u64>,
    },

    /// Start the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("midiator=info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MidiatorError> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SynthConfig::load(path)?,
        None => SynthConfig::default(),
    };
    config.font_dirs.extend(cli.font_dirs.iter().cloned());
    if let Some(family) = &cli.default_family {
        config.default_family = family.clone();
    }

    let fonts = Arc::new(config.font_book()?);
    tracing::debug!(families = fonts.family_count(), "font book ready");

    match cli.command {
        Commands::Generate {
            background,
            records,
            layout,
            out,
            stagger_ms,
        } => {
            if let Some(ms) = stagger_ms {
                config.download_stagger_ms = ms;
            }

            let background = std::fs::read(&background).map_err(|e| {
                MidiatorError::Image(format!(
                    "Failed to read background {}: {}",
                    background.display(),
                    e
                ))
            })?;
            let records = model::records_from_json(&std::fs::read_to_string(&records)?)?;
            let layout = FieldLayout::load(&layout)?;

            let mut generator = BatchGenerator::new(fonts);
            let artifacts = generator.generate(&records, &background, &layout).await?;
            let paths = download::save_all(&artifacts, &out, config.stagger()).await?;

            for path in &paths {
                println!("{}", path.display());
            }
            Ok(())
        }

        Commands::Serve { listen } => {
            let state = Arc::new(AppState::new(fonts));
            server::serve(ServerConfig { listen_addr: listen }, state).await
        }
    }
}
