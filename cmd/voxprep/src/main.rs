//! voxprep - provisions the speaker-embedding model artifact.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use voxprep_encoder::{EncoderConfig, DEFAULT_SEED, SAMPLE_RATE};
use voxprep_provision::{provision, ProvisionRequest};

/// Provision a speaker-embedding ONNX artifact.
///
/// Two provisioning paths, both ending with exactly one model file at the
/// canonical path under the models directory:
///   - synthesize: export a deterministic untrained encoder
///   - fetch: download a pretrained model from the Hugging Face Hub
#[derive(Parser)]
#[command(name = "voxprep")]
#[command(about = "Provision a speaker-embedding ONNX artifact")]
#[command(version)]
struct Cli {
    /// Output directory for model artifacts
    #[arg(long, global = true, default_value = voxprep_provision::MODELS_DIR)]
    models_dir: PathBuf,

    /// Output the report as JSON (for piping)
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the deterministic untrained encoder and export it
    Synthesize {
        /// Weight-initialization seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Example input duration in seconds
        #[arg(long, default_value_t = 4)]
        duration_secs: u32,
    },
    /// Fetch the pretrained embedding model from the artifact store
    Fetch {
        /// Artifact collection (Hugging Face repo id)
        #[arg(long, default_value = voxprep_provision::DEFAULT_COLLECTION)]
        collection: String,

        /// Artifact name within the collection
        #[arg(long, default_value = voxprep_provision::DEFAULT_ARTIFACT)]
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    }

    let request = match &cli.command {
        Commands::Synthesize {
            seed,
            duration_secs,
        } => ProvisionRequest::Synthesize {
            config: EncoderConfig {
                seed: *seed,
                ..EncoderConfig::default()
            },
            example_samples: *duration_secs as usize * SAMPLE_RATE,
        },
        Commands::Fetch { collection, name } => ProvisionRequest::FetchPretrained {
            collection: collection.clone(),
            name: name.clone(),
        },
    };

    let report = provision(&request, &cli.models_dir)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} ({} bytes)", report.path.display(), report.size_bytes);
    }
    Ok(())
}
