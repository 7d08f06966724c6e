use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use humansize::{format_size, DECIMAL};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use mediamux_engine::catalog::Quality;
use mediamux_engine::dialog::Assent;
use mediamux_engine::jobs::{JobKind, JobStatus};
use mediamux_engine::orchestrator::Orchestrator;
use mediamux_engine::poller::Poller;
use mediamux_engine::registry::SharedRegistry;
use mediamux_engine::selection::{ConvertSelection, DownloadSelection};
use mediamux_engine::{catalog, AppConfig, Catalog};
use mediamux_host::{detect_tools, HostBackend};

#[derive(Parser, Debug)]
#[command(name = "mediamux")]
#[command(about = "Convert local media and download remote media", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a local media file
    Convert {
        /// Input media file
        input: PathBuf,

        /// Target container: mp4, mkv, mp3 or wav
        #[arg(short, long)]
        format: String,

        /// Quality preset: high, medium, low or custom
        #[arg(short, long)]
        quality: Option<String>,

        /// Destination directory (defaults to output_dir from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        video_codec: Option<String>,
        #[arg(long)]
        video_engine: Option<String>,
        #[arg(long)]
        audio_codec: Option<String>,
        #[arg(long)]
        audio_engine: Option<String>,
        #[arg(long)]
        resolution: Option<String>,
        #[arg(long)]
        video_bitrate: Option<String>,
        #[arg(long)]
        audio_bitrate: Option<String>,
        #[arg(long)]
        framerate: Option<String>,
        #[arg(long)]
        sample_rate: Option<String>,
        #[arg(long)]
        channels: Option<String>,
    },
    /// Download remote media
    Download {
        /// Media page URL
        url: String,

        /// Format id to fetch (defaults to the first reported format)
        #[arg(short, long)]
        format_id: Option<String>,

        /// List the available formats and exit
        #[arg(long)]
        list_formats: bool,

        /// Destination directory (defaults to output_dir from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Container to remux into: mp4, mkv or webm
        #[arg(long)]
        container: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(true)
        .init();

    let args = Args::parse();

    let config = mediamux_engine::config::load_config(args.config.as_deref())?;

    let backend = Arc::new(HostBackend::new(&config));
    let registry = SharedRegistry::new();
    let orchestrator = Orchestrator::new(backend.clone(), registry.clone());

    let report = match detect_tools(backend.tools()).await {
        Ok(report) => {
            info!("ffmpeg version: {}", report.ffmpeg_version);
            match &report.ytdlp_version {
                Some(version) => info!("yt-dlp version: {}", version),
                None => warn!("yt-dlp not found, downloads will fail"),
            }
            if !report.hardware_engines.is_empty() {
                info!("hardware engines: {}", report.hardware_engines.join(", "));
            }
            report
        }
        Err(e) => {
            error!("tool detection failed: {}", e);
            return Err(anyhow!(e));
        }
    };

    match args.command {
        Command::Convert {
            input,
            format,
            quality,
            output,
            video_codec,
            video_engine,
            audio_codec,
            audio_engine,
            resolution,
            video_bitrate,
            audio_bitrate,
            framerate,
            sample_rate,
            channels,
        } => {
            let catalog = Catalog::builtin();
            let mut selection = ConvertSelection::default();

            if !catalog::is_supported_input(&input) {
                warn!("{} has an unrecognized extension", input.display());
            }
            selection.set_source(input.clone());

            match orchestrator.media_metadata(&input).await {
                Ok(metadata) => {
                    if let (Some(width), Some(height)) = (metadata.width, metadata.height) {
                        info!("input: {}x{}", width, height);
                    }
                    if let Some(duration) = metadata.duration {
                        info!("duration: {:.0}s", duration);
                    }
                    selection.apply_metadata(&metadata);
                }
                Err(e) => warn!("could not probe input: {}", e),
            }

            selection.choose_container(&catalog, &format);
            if let Some(codec) = &video_codec {
                selection.choose_video_codec(&catalog, codec);
            }
            if let Some(engine) = &video_engine {
                selection.choose_video_engine(engine);
            }
            if let Some(codec) = &audio_codec {
                selection.choose_audio_codec(&catalog, codec);
            }
            if let Some(engine) = &audio_engine {
                selection.choose_audio_engine(engine);
            }

            // An explicit tweak without a preset choice means custom values.
            let has_custom_fields = resolution.is_some()
                || video_bitrate.is_some()
                || audio_bitrate.is_some()
                || sample_rate.is_some();
            let quality = match quality {
                Some(id) => Quality::from_id(&id)
                    .ok_or_else(|| anyhow!("unknown quality preset '{}'", id))?,
                None if has_custom_fields => Quality::Custom,
                None => Quality::High,
            };
            selection.choose_quality(&catalog, quality);

            if let Some(resolution) = resolution {
                selection.resolution = resolution;
            }
            if let Some(bitrate) = video_bitrate {
                selection.video_bitrate = bitrate;
            }
            if let Some(bitrate) = audio_bitrate {
                selection.audio_bitrate = bitrate;
            }
            if let Some(framerate) = framerate {
                selection.framerate = framerate;
            }
            if let Some(sample_rate) = sample_rate {
                selection.sample_rate = sample_rate;
            }
            if let Some(channels) = channels {
                selection.channels = channels;
            }

            if let Some(dir) = output.or_else(|| config.output_dir.clone()) {
                selection.set_destination(dir);
            }

            let spec = selection.resolve(&catalog).map_err(|e| anyhow!(e))?;

            if let Some(video) = &spec.video {
                let is_hardware = catalog
                    .engines_of(&video.codec)
                    .iter()
                    .any(|e| {
                        e.id == video.engine
                            && e.hardware != mediamux_engine::catalog::HardwareClass::Software
                    });
                if is_hardware && !report.supports_engine(&video.engine) {
                    warn!(
                        "engine {} is not provided by the local ffmpeg build",
                        video.engine
                    );
                }
                info!(
                    "converting to {} ({} via {}), {} {}",
                    spec.container, video.codec, video.engine, video.bitrate, video.resolution
                );
            } else {
                info!("extracting audio to {} via {}", spec.container, spec.audio.engine);
            }

            let job = orchestrator.submit_conversion(spec).await.map_err(|e| anyhow!(e))?;
            run_until_terminal(&config, &orchestrator, &registry, backend.clone(), JobKind::Convert, &job.id)
                .await
        }
        Command::Download { url, format_id, list_formats, output, container } => {
            let info = orchestrator.remote_info(&url).await.map_err(|e| anyhow!(e))?;
            info!("found: {} ({} formats)", info.title, info.formats.len());

            if list_formats {
                for format in &info.formats {
                    let size = format
                        .filesize
                        .map(|s| format_size(s, DECIMAL))
                        .unwrap_or_else(|| "unknown size".to_string());
                    println!(
                        "{:>8}  {:<6} {:<12} {}",
                        format.format_id,
                        format.ext.as_deref().unwrap_or("-"),
                        format.resolution.as_deref().or(format.format_note.as_deref()).unwrap_or("-"),
                        size
                    );
                }
                return Ok(());
            }

            let mut selection = DownloadSelection::default();
            selection.set_url(&url);
            selection.format_id = format_id;
            selection.apply_remote_info(&info);
            if let Some(container) = container {
                selection.container = container;
            }
            if let Some(dir) = output.or_else(|| config.output_dir.clone()) {
                selection.set_destination(dir);
            }

            let spec = selection.resolve().map_err(|e| anyhow!(e))?;
            let job = orchestrator.submit_download(spec).await.map_err(|e| anyhow!(e))?;
            run_until_terminal(&config, &orchestrator, &registry, backend.clone(), JobKind::Download, &job.id)
                .await
        }
    }
}

/// Mount a poller for the job's kind, render progress until the job reaches
/// a terminal state, then tear the poller down.
async fn run_until_terminal(
    config: &AppConfig,
    orchestrator: &Orchestrator<HostBackend>,
    registry: &SharedRegistry,
    backend: Arc<HostBackend>,
    kind: JobKind,
    id: &str,
) -> Result<()> {
    let poller = Poller::spawn(
        kind,
        backend,
        registry.clone(),
        Duration::from_millis(config.poll_interval_ms),
    );

    let status = watch_job(orchestrator, registry, kind, id).await;
    poller.shutdown().await;

    match status {
        JobStatus::Completed => {
            info!("job completed");
            Ok(())
        }
        JobStatus::Stopped => {
            info!("job stopped");
            Ok(())
        }
        JobStatus::Errored => {
            let message = registry
                .lock()
                .get(id)
                .and_then(|j| j.error.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            Err(anyhow!("job failed: {}", message))
        }
        other => Err(anyhow!("job ended in unexpected state {:?}", other)),
    }
}

async fn watch_job(
    orchestrator: &Orchestrator<HostBackend>,
    registry: &SharedRegistry,
    kind: JobKind,
    id: &str,
) -> JobStatus {
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut last_reported: Option<u8> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, stopping active jobs");
                if let Err(e) = orchestrator.stop_all(kind, &Assent).await {
                    warn!("stop-all failed: {}", e);
                }
                return JobStatus::Stopped;
            }
            _ = ticker.tick() => {
                let partition = registry.partition();
                if let Some(job) = partition.active.iter().find(|j| j.id == id) {
                    if job.status == JobStatus::Running && last_reported != Some(job.progress) {
                        last_reported = Some(job.progress);
                        info!(
                            "{:>3}%  {}  eta {}",
                            job.progress,
                            job.speed.as_deref().unwrap_or("-"),
                            job.eta.as_deref().unwrap_or("-"),
                        );
                    }
                } else if let Some(job) = partition.history.iter().find(|j| j.id == id) {
                    return job.status;
                }
                // Not visible yet: submitted but no snapshot merged so far.
            }
        }
    }
}
