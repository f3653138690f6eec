use anyhow::{Context, Result};
use clap::Parser;
use interview_coach::config::Config;
use interview_coach::pipeline::{analyze_file_with_cancel, print_summary, PipelineConfig};
use interview_coach::record::JsonFileStore;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "interview-coach")]
#[command(version, about = "Analyse an interview answer for pauses, filler words and vocal stress")]
#[command(long_about = "Converts a recording with FFmpeg, measures pause-to-speech ratio, counts filler words in the transcript and estimates vocal stress, then saves the merged analysis as JSON.")]
struct Cli {
    /// Recorded answer (webm, wav, mp3, ...)
    input: PathBuf,

    /// Directory for the analysis JSON (defaults to the configured output_dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Transcript text; skips the transcription service
    #[arg(long, conflicts_with = "transcript_file")]
    transcript: Option<String>,

    /// File containing the transcript; skips the transcription service
    #[arg(long)]
    transcript_file: Option<PathBuf>,

    /// User the analysis belongs to
    #[arg(long)]
    user_id: Option<i64>,

    /// Fuzzy filler match threshold (0-100)
    #[arg(long)]
    fuzzy_threshold: Option<f64>,

    /// Hide progress spinners
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(threshold) = cli.fuzzy_threshold {
        config.analysis.filler.fuzzy_threshold = threshold;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    config.validate().context("Configuration validation failed")?;

    let transcript = match (cli.transcript, cli.transcript_file) {
        (Some(text), _) => Some(text),
        (None, Some(path)) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read transcript {}", path.display()))?,
        ),
        (None, None) => None,
    };

    info!("Input:  {}", cli.input.display());
    info!("Output: {}", config.output_dir.display());

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        ctrlc::set_handler(move || {
            warn!("Cancellation requested, finishing current stage...");
            cancelled.store(true, Ordering::Relaxed);
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    let pipeline_config = PipelineConfig {
        transcript,
        user_id: cli.user_id,
        show_progress: !cli.no_progress,
    };
    let store = JsonFileStore::new(config.output_dir.clone());

    let result = analyze_file_with_cancel(&cli.input, &config, pipeline_config, &store, cancelled)
        .await
        .context("Analysis failed")?;

    print_summary(&result);

    Ok(())
}
