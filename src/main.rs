use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

mod batch;
mod caption;
mod classify;
mod config;
mod discover;
mod models;
mod report;
mod scan;

use batch::{BatchOrchestrator, SelectiveMode};
use caption::LlmCommand;
use config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "alt-text-audit",
    version,
    about = "Find images missing alt text and draft captions with an LLM command-line tool"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Captioning command to run (overrides ALT_TEXT_TOOL)
    #[arg(long, global = true)]
    tool: Option<String>,

    /// Seconds to wait after each full-pass captioning call (overrides ALT_TEXT_PACING_SECS)
    #[arg(long, global = true)]
    pacing_secs: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Report markdown image references missing alt text and caption them
    Check {
        /// Directory to search for markdown files
        #[arg(long)]
        path: PathBuf,

        /// Prefix prepended verbatim to each local image reference
        #[arg(long)]
        base: String,

        /// Only report missing alt text, never run the captioning tool
        #[arg(long)]
        scan_only: bool,

        /// Emit one JSON object per finding
        #[arg(long)]
        json: bool,
    },
    /// Caption every image in a directory with every prompt
    Generate {
        /// Directory holding the images
        #[arg(long, default_value = "./images")]
        images: PathBuf,

        /// Report file to write
        #[arg(long, default_value = "alt-text.html")]
        output: PathBuf,

        /// JSON file with the prompt list
        #[arg(long)]
        prompts: Option<PathBuf>,

        /// Write a JSON report instead of HTML
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Discover(#[from] discover::DiscoverError),
    #[error(transparent)]
    Report(#[from] report::ReportError),
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::from_env()?;
    if let Some(tool) = cli.global.tool {
        config.tool_program = tool;
    }
    if let Some(pacing) = cli.global.pacing_secs.as_deref() {
        config.pacing = config::parse_pacing(pacing)?;
    }

    match cli.command {
        Commands::Check {
            path,
            base,
            scan_only,
            json,
        } => {
            let mode = if scan_only {
                SelectiveMode::ScanOnly
            } else {
                SelectiveMode::Generate
            };
            check(config, &path, &base, mode, json).await
        }
        Commands::Generate {
            images,
            output,
            prompts,
            json,
        } => {
            if let Some(prompts) = prompts {
                config = config.with_prompts(config::load_prompts(&prompts)?)?;
            }
            generate(config, &images, &output, json).await
        }
    }
}

async fn check(
    config: Config,
    path: &Path,
    base: &str,
    mode: SelectiveMode,
    json: bool,
) -> Result<(), AppError> {
    let start_path = absolute(path);
    println!("Searching for markdown files in: {}", start_path.display());

    let documents = discover::find_markdown_files(&start_path)?;
    if documents.is_empty() {
        println!("No markdown files found.");
        return Ok(());
    }
    println!("Found {} markdown file(s).", documents.len());

    let orchestrator = BatchOrchestrator::new(LlmCommand::new(&config.tool_program), config);
    let summary = orchestrator
        .selective_pass(&documents, base, mode, |finding| {
            if json {
                match report::render_finding_json(finding) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!(error = %e, "failed to serialize finding"),
                }
            } else {
                print!("{}", report::render_finding(finding));
            }
        })
        .await;

    tracing::info!(
        documents = summary.documents_scanned,
        failed = summary.documents_failed,
        references = summary.references,
        missing = summary.missing_alt_text,
        captioned = summary.captioned,
        "check complete"
    );
    Ok(())
}

async fn generate(config: Config, dir: &Path, output: &Path, json: bool) -> Result<(), AppError> {
    let images: Vec<PathBuf> = discover::find_images(dir, &config.image_extensions)?
        .iter()
        .map(|p| absolute(p))
        .collect();
    if images.is_empty() {
        println!("No image files found in {} directory", dir.display());
        return Ok(());
    }
    tracing::info!(images = images.len(), prompts = config.prompts.len(), "starting full pass");

    let orchestrator = BatchOrchestrator::new(LlmCommand::new(&config.tool_program), config);
    let results = orchestrator.full_pass(&images).await;

    let contents = if json {
        report::render_json(&results)?
    } else {
        report::render_html(&results)
    };
    report::write_report(output, &contents)?;

    let failures = results.iter().filter(|r| !r.status.is_ok()).count();
    tracing::info!(
        results = results.len(),
        failures,
        prompts = orchestrator.config().prompts.len(),
        "full pass complete"
    );
    println!(
        "Generated alt text for {} images. Results saved to {}",
        images.len(),
        output.display()
    );
    Ok(())
}

/// Makes `path` absolute against the current directory without touching the
/// filesystem.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
