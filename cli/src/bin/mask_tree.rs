use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use cli::{BatchConfig, BatchInput};
use color_eyre::eyre::{Result, WrapErr, eyre};
use mask_tree::{
    BoolMask, FloodFillSegmenter, MaskGenerator, MaskSet, Pipeline, SegmenterMaskGenerator, load_image, load_mask_dir,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mask-tree")]
#[command(about = "Vectorize an image and its region masks into a tree of polygons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every input of a batch configuration file (TOML or JSON)
    Process {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Vectorize a single image with default options
    Convert {
        #[arg(short, long)]
        image: String,
        /// Directory of PNG masks; generated by flood fill when omitted
        #[arg(short, long)]
        masks: Option<String>,
        #[arg(short, long, default_value = "out")]
        output_dir: String,
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Print the JSON schema of the batch configuration file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Process { config } => {
            info!("Loading batch configuration from: {}", config.display());
            BatchConfig::from_file(&config).wrap_err_with(|| format!("Failed to load {}", config.display()))?
        }
        Commands::Convert {
            image,
            masks,
            output_dir,
            name,
        } => BatchConfig::single(BatchInput { image, masks, name }, output_dir),
        Commands::Schema => {
            println!("{}", BatchConfig::schema_json()?);
            return Ok(());
        }
    };

    run_batch(config).await
}

async fn run_batch(config: BatchConfig) -> Result<()> {
    let started = Instant::now();
    let mut failures = 0usize;

    for input in config.inputs.clone() {
        let name = input.name();
        let job_config = config.clone();
        let job = tokio::task::spawn_blocking(move || process_input(&job_config, &input));

        tokio::select! {
            joined = job => match joined? {
                Ok(written) => info!(%name, files = written.len(), "image done"),
                Err(err) => {
                    failures += 1;
                    error!(%name, "image failed: {err:?}");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                warn!(%name, "interrupted, discarding the image in progress");
                std::process::exit(130);
            }
        }
    }

    info!(
        inputs = config.inputs.len(),
        failures,
        elapsed = ?started.elapsed(),
        "batch finished"
    );
    if failures > 0 {
        return Err(eyre!("{failures} of {} images failed", config.inputs.len()));
    }
    Ok(())
}

fn process_input(config: &BatchConfig, input: &BatchInput) -> Result<Vec<PathBuf>> {
    let started = Instant::now();
    let image = load_image(&input.image).wrap_err_with(|| format!("Failed to load image {}", input.image))?;

    let masks = match &input.masks {
        Some(dir) => load_mask_dir(dir).wrap_err_with(|| format!("Failed to load masks from {dir}"))?,
        None => {
            info!(image = %input.image, "no mask directory, generating masks");
            SegmenterMaskGenerator::new(FloodFillSegmenter::new(config.generator.clone())).generate(&image)?
        }
    };
    let masks = if config.filter_masks {
        admit(image.width(), image.height(), masks)?
    } else {
        masks
    };
    info!(image = %input.image, masks = masks.len(), "masks ready");

    let pipeline = Pipeline::builder().options(config.export.clone()).build();
    let output = pipeline.run(&image, masks)?;
    info!(
        nodes = output.vector_tree.len(),
        detail_nodes = output.detail.as_ref().map(|d| d.vector_tree.len()),
        elapsed = ?started.elapsed(),
        "trees built"
    );

    let written = pipeline.export(&output, Path::new(&config.output_dir), &input.name())?;
    Ok(written)
}

/// Pass masks through overlap subtraction and size checks, in order.
fn admit(width: u32, height: u32, masks: Vec<BoolMask>) -> Result<Vec<BoolMask>> {
    let total = masks.len();
    let mut set = MaskSet::new(width, height);
    for mask in &masks {
        set.add_mask(mask)?;
    }
    if set.len() < total {
        info!(kept = set.len(), refused = total - set.len(), "masks filtered");
    }
    Ok(set.into_masks())
}
