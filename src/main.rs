use clap::{Parser, Subcommand};
use profilex_engine::{EngineConfig, GridEmbedder, SimilarityEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Hybrid similarity search for extrusion profile drawings
#[derive(Parser, Debug)]
#[command(name = "profilex")]
#[command(about = "Find similar extrusion profiles by shape", long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "./profilex.json")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the catalog from the configured image directory
    Build {
        /// Rebuild even when a persisted catalog exists
        #[arg(long)]
        force: bool,
    },
    /// Find the most similar profiles to an indexed profile code
    Search {
        /// Profile code to search for (case-insensitive)
        code: String,

        /// Number of matches to return; defaults to the configured top_k
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Add one profile image to an existing catalog
    Add {
        /// Path to the profile image
        image: PathBuf,

        /// Profile code; defaults to the image file stem
        #[arg(long)]
        code: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting profilex v{}", env!("CARGO_PKG_VERSION"));

    let config = if args.config.exists() {
        EngineConfig::from_json_file(&args.config)?
    } else {
        info!("No config file at {:?}, using defaults", args.config);
        EngineConfig::default()
    };

    let embedder = Arc::new(GridEmbedder::for_dimension(config.embedding_dim)?);
    let engine = SimilarityEngine::new(config, embedder)?;

    match args.command {
        Command::Build { force } => {
            engine.initialize(force)?;
            println!("Catalog ready: {} profiles indexed", engine.len());
        }
        Command::Search { code, k } => {
            engine.initialize(false)?;
            let k = k.unwrap_or(engine.config().top_k);
            let results = engine.find_similar(&code, k)?;
            if results.is_empty() {
                println!("No matches for {code}");
            }
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "{:>3}. {:<20} {:6.2}%",
                    rank + 1,
                    result.profile_code,
                    result.score
                );
            }
        }
        Command::Add { image, code } => {
            engine.initialize(false)?;
            if engine.add_profile(&image, code.as_deref())? {
                println!("Added: {} profiles indexed", engine.len());
            } else {
                println!("Already indexed, nothing to do");
            }
        }
    }

    Ok(())
}
