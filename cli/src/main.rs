//! pdfveil CLI - publish blurred PDF previews and encrypted originals

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfveil::{
    ContentStore, Document, MemoryStore, Pdfveil, PreviewOptions, PreviewOutcome,
};

#[derive(Parser)]
#[command(name = "pdfveil")]
#[command(version)]
#[command(about = "Publish blurred PDF previews and encrypted originals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a redacted preview of a PDF
    Preview {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        preview: PreviewArgs,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Encrypt a PDF and publish the ciphertext
    Encrypt {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Retries for the encrypted upload
        #[arg(long, default_value_t = pdfveil::cipher::DEFAULT_RETRIES)]
        retries: u32,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Encrypt a PDF, publish it, then publish its preview
    Upload {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        preview: PreviewArgs,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args, Default)]
struct PreviewArgs {
    /// JSON options file (camelCase keys)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Patch height in pixels
    #[arg(long)]
    patch_height: Option<u32>,

    /// Patch width in pixels (full page width if unset)
    #[arg(long)]
    patch_width: Option<u32>,

    /// Fraction of each page to blur (0-1)
    #[arg(long)]
    coverage: Option<f64>,

    /// Blur strength (Gaussian sigma)
    #[arg(long)]
    blur: Option<f32>,

    /// Rasterization resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Pages uploaded per batch
    #[arg(long)]
    batch: Option<usize>,

    /// Retries per upload
    #[arg(long)]
    retries: Option<u32>,

    /// Leading pages published without redaction
    #[arg(long)]
    unredacted: Option<u32>,

    /// Append the manifest id to this JSON index
    #[arg(long, value_name = "PATH")]
    index: Option<PathBuf>,

    /// Seed for patch placement
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct StoreArgs {
    /// Keep uploads in memory instead of pinning them
    #[arg(long)]
    dry_run: bool,

    /// Pinata JWT
    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    jwt: Option<String>,

    /// Pinata API root
    #[arg(long, env = "PINATA_API_URL")]
    api_url: Option<String>,
}

impl PreviewArgs {
    fn options(&self) -> Result<PreviewOptions, Box<dyn std::error::Error>> {
        let mut options = match &self.config {
            Some(path) => PreviewOptions::from_json_file(path)?,
            None => PreviewOptions::default(),
        };

        if let Some(height) = self.patch_height {
            options = options.with_patch_height(height);
        }
        if let Some(width) = self.patch_width {
            options = options.with_patch_width(width);
        }
        if let Some(coverage) = self.coverage {
            options = options.with_coverage(coverage);
        }
        if let Some(sigma) = self.blur {
            options = options.with_blur_strength(sigma);
        }
        if let Some(dpi) = self.dpi {
            options = options.with_dpi(dpi);
        }
        if let Some(size) = self.batch {
            options = options.with_batch_size(size);
        }
        if let Some(retries) = self.retries {
            options = options.with_retries(retries);
        }
        if let Some(count) = self.unredacted {
            options = options.with_unredacted_pages(count);
        }
        if let Some(ref index) = self.index {
            options = options.with_index_path(index);
        }

        options.validate()?;
        Ok(options)
    }
}

impl StoreArgs {
    fn open(&self) -> Result<Arc<dyn ContentStore>, Box<dyn std::error::Error>> {
        if self.dry_run {
            println!("{}", "Dry run: uploads are kept in memory".yellow());
            return Ok(Arc::new(MemoryStore::new()));
        }

        let jwt = self
            .jwt
            .clone()
            .ok_or("PINATA_JWT is not set (use --jwt or --dry-run)")?;
        let mut store = pdfveil::publish::PinataStore::new(jwt)?;
        if let Some(ref url) = self.api_url {
            store = store.with_api_url(url);
        }
        Ok(Arc::new(store))
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Preview {
            input,
            preview,
            store,
        } => run_async(cmd_preview(&input, &preview, &store)),
        Commands::Encrypt {
            input,
            retries,
            store,
        } => run_async(cmd_encrypt(&input, retries, &store)),
        Commands::Upload {
            input,
            preview,
            store,
        } => run_async(cmd_upload(&input, &preview, &store)),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_async<F>(future: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: std::future::Future<Output = Result<(), Box<dyn std::error::Error>>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(future)
}

fn spinner(message: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}

fn veil(
    preview: &PreviewArgs,
    store: &StoreArgs,
) -> Result<Pdfveil, Box<dyn std::error::Error>> {
    let mut veil = Pdfveil::new(store.open()?).with_options(preview.options()?);
    if let Some(seed) = preview.seed {
        veil = veil.with_seed(seed);
    }
    Ok(veil)
}

fn print_outcome(outcome: &PreviewOutcome) {
    println!("\n{}", "Preview published".green().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Source".bold(), outcome.manifest.source_filename);
    println!("{}: {}", "Manifest".bold(), outcome.manifest_content_id());
    println!("{}: {}", "Pages".bold(), outcome.manifest.page_count());
    if let Some(ref index) = outcome.index_path {
        println!("{}: {}", "Index".bold(), index.display());
    }

    if !outcome.failed_pages.is_empty() {
        println!(
            "\n{} {} pages could not be published",
            "Warning:".yellow().bold(),
            outcome.failed_pages.len()
        );
        for failure in &outcome.failed_pages {
            println!(
                "  {} page {} ({}): {}",
                "•".dimmed(),
                failure.page,
                failure.file,
                failure.error
            );
        }
    }
}

async fn cmd_preview(
    input: &Path,
    preview: &PreviewArgs,
    store: &StoreArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let veil = veil(preview, store)?;

    let pb = spinner("Rasterizing, redacting and uploading pages...")?;
    let result = veil.preview(&Document::from_path(input)).await;
    pb.finish_and_clear();

    print_outcome(&result?);
    Ok(())
}

async fn cmd_encrypt(
    input: &Path,
    retries: u32,
    store: &StoreArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let veil = Pdfveil::new(store.open()?).with_encrypt_retries(retries);

    let pb = spinner("Encrypting and uploading...")?;
    let result = veil.encrypt(&Document::from_path(input)).await;
    pb.finish_and_clear();
    let artifact = result?;

    println!("{}", "Encrypted PDF published".green().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Content id".bold(), artifact.content_id);
    println!("{}: {}", "Key".bold(), artifact.key_hex());
    println!("{}: {}", "IV".bold(), artifact.iv_hex());
    println!(
        "\n{}",
        "Store the key and IV now; they are not kept anywhere else.".yellow()
    );
    Ok(())
}

async fn cmd_upload(
    input: &Path,
    preview: &PreviewArgs,
    store: &StoreArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let veil = veil(preview, store)?;

    let pb = spinner("Encrypting and publishing preview...")?;
    let result = veil.upload(&Document::from_path(input)).await;
    pb.finish_and_clear();

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfveil".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Blurred PDF previews and encrypted originals on IPFS");
    println!();
    println!("License: MIT");
}
