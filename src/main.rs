// Plant Doctor - command line entry point

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plant_doctor::services::{create_provider, render_failure, render_result};
use plant_doctor::{
    AnalysisSession, AnalysisState, AppConfig, AppError, ConfigService, DiagnosisClient,
};
use plant_doctor_core::{validate, DetachedPreviews, ImageFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code for an image the validator rejects
const EXIT_INVALID_IMAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "plant-doctor",
    version,
    about = "Diagnose plant diseases, pests and health issues from a photo",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JPEG, PNG or WebP image to analyze (5MB max)
    image: Option<PathBuf>,

    /// JSON configuration file; environment variables are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for the diagnosis
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate an image without calling the model
    Check {
        /// Image to validate
        image: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plant_doctor=info,plant_doctor_llm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Some(Commands::Check { image }) => check(&image).await,
        None => {
            let image = cli
                .image
                .ok_or_else(|| anyhow!("an IMAGE path is required (see --help)"))?;
            analyze(&image, cli.config.as_deref(), cli.format).await
        }
    }
}

async fn load_image(path: &Path) -> Result<ImageFile> {
    ImageFile::from_path(path)
        .await
        .with_context(|| format!("cannot open {}", path.display()))
}

async fn check(path: &Path) -> Result<ExitCode> {
    let file = load_image(path).await?;
    if let Err(e) = validate(&file) {
        eprintln!("{}", e);
        return Ok(ExitCode::from(EXIT_INVALID_IMAGE));
    }
    println!("{} ({}) is ready for analysis", file.name(), file.display_size());
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => ConfigService::load(path)?.into_config(),
        None => AppConfig::from_env().map_err(AppError::config)?,
    };
    Ok(config)
}

async fn analyze(path: &Path, config_path: Option<&Path>, format: OutputFormat) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let provider = create_provider(config.provider_config()).await?;
    let client = Arc::new(DiagnosisClient::new(provider));
    tracing::info!(
        "Using provider={} model={}",
        client.provider_name(),
        client.model()
    );

    let mut session = AnalysisSession::new(client, Arc::new(DetachedPreviews::new()));
    let file = load_image(path).await?;
    if let Err(e) = session.select_image(file) {
        eprintln!("{}", e);
        return Ok(ExitCode::from(EXIT_INVALID_IMAGE));
    }

    session.analyze().await?;

    match session.state() {
        AnalysisState::Completed(_, result) => {
            match format {
                OutputFormat::Text => print!("{}", render_result(result)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
            }
            Ok(ExitCode::SUCCESS)
        }
        AnalysisState::Failed(_, failure) => {
            eprintln!("{}", render_failure(failure));
            if let Some(raw) = &failure.raw {
                tracing::debug!("Model reply: {}", raw);
            }
            Ok(ExitCode::FAILURE)
        }
        other => Err(anyhow!("analysis ended in unexpected state '{}'", other.phase())),
    }
}
