use crate::analysis::{
    analyze_stress, detect_fillers, segment, Analysis, FillerResult, SegmentationResult,
    StressResult,
};
use crate::audio::{check_ffmpeg, decode_wav, extract_audio, preprocess, AudioSignal};
use crate::config::Config;
use crate::error::{CoachError, Result};
use crate::record::{AnalysisRecord, RecordStore};
use crate::transcribe::{StaticTranscriber, Transcriber, WhisperClient};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Per-run options layered over [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Transcript to analyse instead of calling a transcription service.
    pub transcript: Option<String>,
    /// Owner recorded alongside the analysis.
    pub user_id: Option<i64>,
    /// Show progress spinners.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transcript: None,
            user_id: None,
            show_progress: true,
        }
    }
}

/// Timing collected while analysing one recording.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub decode_time: Duration,
    pub analysis_time: Duration,
    pub audio_duration: Duration,
    pub transcriber: String,
}

#[derive(Debug)]
pub struct PipelineResult {
    pub record: AnalysisRecord,
    pub saved_to: PathBuf,
    pub stats: PipelineStats,
}

/// Run `job` on a blocking worker under a time budget.
///
/// Panics, timeouts and analyzer errors all come back as
/// `Analysis::Failure`, so one analyzer never takes the others down.
pub async fn run_isolated<T, F>(name: &'static str, budget: Duration, job: F) -> Analysis<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let started = Instant::now();
    let outcome = tokio::time::timeout(budget, tokio::task::spawn_blocking(job)).await;

    let analysis = match outcome {
        Ok(Ok(result)) => Analysis::from(result),
        Ok(Err(join_error)) => Analysis::failure(format!("{name} crashed: {join_error}")),
        Err(_) => Analysis::failure(CoachError::Timeout(name.to_string(), budget).to_string()),
    };

    match analysis.error() {
        Some(error) => warn!("{} failed after {:?}: {}", name, started.elapsed(), error),
        None => debug!("{} finished in {:?}", name, started.elapsed()),
    }

    analysis
}

/// Run the acoustic analyzers and the filler detector on an in-memory signal.
///
/// `transcript` resolves to the speech-to-text outcome. The acoustic
/// analyzers start straight away and do not wait for it; an error there only
/// fails the filler analysis.
pub async fn analyze_signal<F>(
    signal: Arc<AudioSignal>,
    transcript: F,
    config: &Config,
) -> (
    Analysis<SegmentationResult>,
    Analysis<FillerResult>,
    Analysis<StressResult>,
)
where
    F: Future<Output = Result<String>>,
{
    let budget = config.timeout();

    let pause = {
        let signal = signal.clone();
        let cfg = config.analysis.segmenter.clone();
        run_isolated("pause analysis", budget, move || segment(&signal, &cfg))
    };

    let stress = {
        let signal = signal.clone();
        let cfg = config.analysis.stress.clone();
        run_isolated("stress analysis", budget, move || analyze_stress(&signal, &cfg))
    };

    let filler_cfg = config.analysis.filler.clone();
    let fillers = async move {
        match transcript.await {
            Ok(text) => {
                run_isolated("filler analysis", budget, move || {
                    Ok(detect_fillers(&text, &filler_cfg))
                })
                .await
            }
            Err(e) => Analysis::failure(format!("transcript unavailable: {e}")),
        }
    };

    futures::join!(pause, fillers, stress)
}

/// Pick the transcript source for a run.
pub fn build_transcriber(
    config: &Config,
    pipeline_config: &PipelineConfig,
) -> Result<Box<dyn Transcriber>> {
    if let Some(ref text) = pipeline_config.transcript {
        return Ok(Box::new(StaticTranscriber::new(text.clone())));
    }

    let api_key = config.openai_api_key.as_ref().ok_or_else(|| {
        CoachError::Config(
            "No transcript given and OPENAI_API_KEY is not set. Pass --transcript or export OPENAI_API_KEY=sk-..."
                .to_string(),
        )
    })?;

    let mut client = WhisperClient::new(api_key.clone()).with_base_url(config.whisper_url.clone());
    if let Some(ref language) = config.language {
        client = client.with_language(language.clone());
    }
    Ok(Box::new(client))
}

fn spinner(multi_progress: Option<&MultiProgress>, message: &'static str) -> Option<ProgressBar> {
    multi_progress.map(|mp| {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    })
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(CoachError::Cancelled);
    }
    Ok(())
}

/// Analyse a recording and persist the merged record.
pub async fn analyze_file(
    input: &Path,
    config: &Config,
    pipeline_config: PipelineConfig,
    store: &dyn RecordStore,
) -> Result<PipelineResult> {
    let cancelled = Arc::new(AtomicBool::new(false));
    analyze_file_with_cancel(input, config, pipeline_config, store, cancelled).await
}

/// Analyse a recording with cancellation support.
///
/// Stages:
/// 1. Convert the input to 16 kHz mono WAV and decode it
/// 2. Transcribe while the acoustic analyzers run
/// 3. Merge the results and hand them to `store`
pub async fn analyze_file_with_cancel(
    input: &Path,
    config: &Config,
    pipeline_config: PipelineConfig,
    store: &dyn RecordStore,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    if !input.exists() {
        return Err(CoachError::FileNotFound(input.display().to_string()));
    }

    check_ffmpeg()?;

    let temp_dir = TempDir::new()?;
    debug!("Using temp directory: {:?}", temp_dir.path());

    let multi_progress = pipeline_config.show_progress.then(MultiProgress::new);

    // Stage 1: decode
    info!("Stage 1/3: Decoding {:?}", input);
    let decode_start = Instant::now();
    let decode_pb = spinner(multi_progress.as_ref(), "Decoding audio...");

    let wav_path = temp_dir.path().join("audio.wav");
    extract_audio(input, &wav_path).await?;
    let mut signal = decode_wav(&wav_path)?;
    preprocess(&mut signal, &config.analysis.preprocess);
    let audio_duration = signal.duration();

    if let Some(pb) = decode_pb {
        pb.finish_with_message(format!(
            "✓ Audio decoded ({:.1}s)",
            audio_duration.as_secs_f64()
        ));
    }
    let decode_time = decode_start.elapsed();
    info!(
        "Decoded {:.1}s of audio in {:.2}s",
        audio_duration.as_secs_f64(),
        decode_time.as_secs_f64()
    );

    check_cancelled(&cancelled)?;

    // Stage 2: transcription and analysis
    info!("Stage 2/3: Transcribing and analysing");
    let analysis_start = Instant::now();
    let analysis_pb = spinner(multi_progress.as_ref(), "Analysing speech...");

    let transcriber = build_transcriber(config, &pipeline_config);
    let transcriber_name = match &transcriber {
        Ok(t) => t.name().to_string(),
        Err(e) => {
            warn!("Skipping transcription: {}", e);
            "none".to_string()
        }
    };

    let mut transcription = None;
    let transcript = async {
        let outcome = match &transcriber {
            Ok(t) => t.transcribe(&wav_path).await,
            Err(e) => Err(CoachError::Transcription(e.to_string())),
        };
        outcome.map(|t| {
            if let Some(ref language) = t.language {
                info!("Transcript language: {}", language);
            }
            transcription = Some(t.text.clone());
            t.text
        })
    };

    let (pause, fillers, stress) = analyze_signal(Arc::new(signal), transcript, config).await;

    if let Some(pb) = analysis_pb {
        let failed = [pause.is_success(), fillers.is_success(), stress.is_success()]
            .iter()
            .filter(|ok| !**ok)
            .count();
        pb.finish_with_message(format!("✓ Analysis complete ({failed} analyzer(s) failed)"));
    }
    let analysis_time = analysis_start.elapsed();

    check_cancelled(&cancelled)?;

    // Stage 3: persist
    info!("Stage 3/3: Saving analysis");
    let record = AnalysisRecord::new(
        pipeline_config.user_id,
        transcription,
        pause,
        fillers,
        stress,
    );
    let saved_to = store.save(&record)?;

    Ok(PipelineResult {
        record,
        saved_to,
        stats: PipelineStats {
            total_time: start_time.elapsed(),
            decode_time,
            analysis_time,
            audio_duration,
            transcriber: transcriber_name,
        },
    })
}

fn describe<T>(analysis: &Analysis<T>, render: impl Fn(&T) -> String) -> String {
    match analysis {
        Analysis::Success(value) => render(value),
        Analysis::Failure { error } => format!("failed ({error})"),
    }
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    let record = &result.record;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                        Speech Analysis                         ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Analysis:   {}", record.file_id);
    println!("  Saved to:   {}", result.saved_to.display());
    println!(
        "  Duration:   {:.1}s audio",
        result.stats.audio_duration.as_secs_f64()
    );
    println!("  Transcript: {}", result.stats.transcriber);
    println!();
    println!(
        "  Pauses:     {}",
        describe(&record.pause_to_speech_analysis, |p| format!(
            "ratio {:.2} ({:.0} ms silence / {:.0} ms speech, {} long pauses)",
            p.pause_to_speech_ratio, p.total_silence_ms, p.total_speech_ms, p.pause_count
        ))
    );
    println!(
        "  Fillers:    {}",
        describe(&record.filler_word_analysis, |f| {
            let terms: Vec<String> = f.counts.iter().map(|(t, c)| format!("{t}={c}")).collect();
            format!("{} total [{}]", f.total_count, terms.join(", "))
        })
    );
    println!(
        "  Stress:     {}",
        describe(&record.stress_analysis, |s| format!(
            "{} (score {:.3})",
            s.stress_level, s.stress_score
        ))
    );
    if let Some(rate) = record.summary.filler_rate {
        println!("  Filler rate: {:.1} per 100 words", rate * 100.0);
    }
    println!();
    println!("  Timing:");
    println!(
        "    Decode:      {:.2}s",
        result.stats.decode_time.as_secs_f64()
    );
    println!(
        "    Analyse:     {:.2}s",
        result.stats.analysis_time.as_secs_f64()
    );
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert!(config.transcript.is_none());
        assert!(config.user_id.is_none());
        assert!(config.show_progress);
    }

    #[test]
    fn test_build_transcriber_prefers_given_text() {
        let pipeline_config = PipelineConfig {
            transcript: Some("hello".to_string()),
            ..PipelineConfig::default()
        };
        let transcriber = build_transcriber(&Config::default(), &pipeline_config).unwrap();
        assert_eq!(transcriber.name(), "Provided transcript");
    }

    #[test]
    fn test_build_transcriber_needs_key() {
        let result = build_transcriber(&Config::default(), &PipelineConfig::default());
        assert!(matches!(result, Err(CoachError::Config(_))));

        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        let transcriber = build_transcriber(&config, &PipelineConfig::default()).unwrap();
        assert_eq!(transcriber.name(), "OpenAI Whisper");
    }

    #[tokio::test]
    async fn test_run_isolated_catches_panic() {
        let analysis: Analysis<u32> =
            run_isolated("exploding analysis", Duration::from_secs(5), || {
                panic!("numerical blow-up")
            })
            .await;
        assert!(analysis.error().unwrap().contains("exploding analysis crashed"));
    }

    #[tokio::test]
    async fn test_run_isolated_times_out() {
        let analysis: Analysis<u32> = run_isolated("slow analysis", Duration::from_millis(10), || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(1)
        })
        .await;
        assert!(analysis.error().unwrap().contains("time budget"));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let store = crate::record::JsonFileStore::new("/tmp/unused");
        let result = analyze_file(
            Path::new("/nonexistent/answer.webm"),
            &Config::default(),
            PipelineConfig::default(),
            &store,
        )
        .await;
        assert!(matches!(result, Err(CoachError::FileNotFound(_))));
    }
}
