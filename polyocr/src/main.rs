use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polyocr::config::Config;
use polyocr::error::{PolyOcrError, Result};
use polyocr::models::EngineSelection;
use polyocr::ocr::{EngineRegistry, ImagePreprocessor};
use polyocr::services::{availability_banner, summarize, write_json, BatchDriver, Orchestrator};

#[derive(Parser)]
#[command(name = "polyocr")]
#[command(about = "Run several OCR engines against images and compare their output")]
struct Args {
    /// Engines to run: paddleocr, easyocr, surya, tesseract or all.
    /// Repeatable and comma-separated.
    #[arg(long = "engine", value_delimiter = ',', default_value = "paddleocr")]
    engines: Vec<String>,

    /// Single image to process
    #[arg(long, conflicts_with = "input_dir")]
    input: Option<PathBuf>,

    /// Directory of images to process recursively
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// JSON file for the single-image result; prints a summary when omitted
    #[arg(long, requires = "input")]
    output: Option<PathBuf>,

    /// Directory for batch results (defaults to OCR_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Process batch images in lexicographic path order
    #[arg(long)]
    sort: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polyocr=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    match run(args, config).await {
        Ok(()) => Ok(()),
        // Logged once here; the exit status carries the failure.
        Err(e) if e.is_input_resolution() => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(args: Args, config: Config) -> Result<()> {
    let selection = EngineSelection::from_names(args.engines.as_slice())?;

    if args.input.is_none() && args.input_dir.is_none() {
        return Err(PolyOcrError::NoInput);
    }
    if let Some(path) = args.input.as_ref().filter(|p| !p.exists()) {
        return Err(PolyOcrError::InputNotFound(path.clone()));
    }

    let registry = Arc::new(EngineRegistry::new(&config.ocr));
    let available = registry.available().await;
    print!("{}", availability_banner(&available));

    let orchestrator = Orchestrator::new(
        registry,
        ImagePreprocessor::new(),
        Duration::from_secs(config.ocr.timeout_secs),
    );

    if let Some(root) = args.input_dir {
        let output_dir = args.output_dir.unwrap_or(config.output.dir);
        let batch = BatchDriver::new(&orchestrator, output_dir).sorted(args.sort);
        let results = batch.run(&root, &selection).await?;
        println!(
            "Processed {} images. Results saved to {}",
            results.len(),
            batch.output_dir().display()
        );
        return Ok(());
    }

    if let Some(path) = args.input {
        let result = orchestrator.process(&path, &selection).await;
        match args.output {
            Some(output) => {
                write_json(&output, &result)?;
                println!("Results saved to {}", output.display());
            }
            None => print!("{}", summarize(&result)),
        }
    }

    Ok(())
}
