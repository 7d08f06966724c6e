use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use mediamux_engine::backend::Metadata;
use mediamux_engine::catalog::Catalog;
use mediamux_engine::error::BackendError;
use mediamux_engine::jobs::ConvertSpec;

use crate::store::JobTable;
use crate::Tools;

// Internal ffprobe JSON structures
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    streams: Option<Vec<FfprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: String,
    codec_name: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
}

/// Execute ffprobe on a file and reduce its JSON output to the metadata
/// the conversion form shows.
pub async fn probe_media(tools: &Tools, path: &Path) -> Result<Metadata, BackendError> {
    let output = Command::new(&tools.ffprobe)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BackendError::Tool(format!("ffprobe failed: {}", stderr.trim())));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&stdout)
}

pub fn parse_probe_output(json: &str) -> Result<Metadata, BackendError> {
    let raw: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| BackendError::Tool(format!("unreadable ffprobe output: {}", e)))?;

    let mut metadata = Metadata::default();

    if let Some(format) = raw.format {
        metadata.duration = format.duration.and_then(|d| d.parse::<f64>().ok());
        metadata.size = format.size.and_then(|s| s.parse::<u64>().ok());
        metadata.bitrate = format.bit_rate.and_then(|b| b.parse::<u64>().ok());
    }

    let streams = raw.streams.unwrap_or_default();
    if let Some(video) = streams.iter().find(|s| s.codec_type == "video") {
        metadata.width = video.width;
        metadata.height = video.height;
        metadata.codec = video.codec_name.clone();
    } else if let Some(audio) = streams.iter().find(|s| s.codec_type == "audio") {
        metadata.codec = audio.codec_name.clone();
    }

    Ok(metadata)
}

/// Where the converted file lands: input stem + the container's extension,
/// inside the chosen destination directory.
pub fn output_path(spec: &ConvertSpec) -> PathBuf {
    let stem = spec
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = Catalog::builtin()
        .container(&spec.container)
        .map(|c| c.extension)
        .unwrap_or(spec.container.as_str());
    spec.output_dir.join(format!("{}.{}", stem, extension))
}

/// Build the ffmpeg argument list for a resolved conversion. Empty
/// user-entered fields simply omit their flag.
pub fn convert_args(spec: &ConvertSpec, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".to_string(),
        "-i".to_string(),
        spec.input.display().to_string(),
    ];

    match &spec.video {
        Some(video) => {
            args.push("-c:v".to_string());
            args.push(video.engine.clone());
            if !video.bitrate.is_empty() {
                args.push("-b:v".to_string());
                args.push(video.bitrate.clone());
            }
            if let Some((width, height)) = parse_resolution(&video.resolution) {
                args.push("-vf".to_string());
                args.push(format!("scale={}:{}", width, height));
            }
            if let Some(framerate) = &video.framerate {
                args.push("-r".to_string());
                args.push(framerate.clone());
            }
        }
        // Audio-only container: drop the video streams entirely.
        None => args.push("-vn".to_string()),
    }

    args.push("-c:a".to_string());
    args.push(spec.audio.engine.clone());
    if !spec.audio.bitrate.is_empty() {
        args.push("-b:a".to_string());
        args.push(spec.audio.bitrate.clone());
    }
    if !spec.audio.sample_rate.is_empty() {
        args.push("-ar".to_string());
        args.push(spec.audio.sample_rate.clone());
    }
    if !spec.audio.channels.is_empty() {
        args.push("-ac".to_string());
        args.push(spec.audio.channels.clone());
    }

    args.push(output.display().to_string());
    args
}

fn parse_resolution(resolution: &str) -> Option<(u32, u32)> {
    let (width, height) = resolution.split_once('x')?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

/// Accumulates ffmpeg's `-progress pipe:1` key=value stream. A `progress=`
/// line closes one block and yields an update; percent never regresses.
pub struct ProgressTracker {
    duration: Option<f64>,
    out_time: Option<f64>,
    speed: Option<f64>,
    last_percent: u8,
}

impl ProgressTracker {
    pub fn new(duration: Option<f64>) -> ProgressTracker {
        ProgressTracker { duration, out_time: None, speed: None, last_percent: 0 }
    }

    pub fn ingest(&mut self, line: &str) -> Option<ProgressUpdate> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            "out_time_ms" => {
                // Despite the name, the value is in microseconds.
                if let Ok(us) = value.parse::<u64>() {
                    self.out_time = Some(us as f64 / 1_000_000.0);
                }
                None
            }
            "out_time" => {
                if self.out_time.is_none() {
                    self.out_time = parse_out_time(value);
                }
                None
            }
            "speed" => {
                if let Ok(speed) = value.trim_end_matches('x').trim().parse::<f64>() {
                    self.speed = Some(speed);
                }
                None
            }
            "progress" => Some(self.close_block()),
            _ => None,
        }
    }

    fn close_block(&mut self) -> ProgressUpdate {
        let percent = match (self.out_time, self.duration) {
            (Some(out_time), Some(duration)) if duration > 0.0 => {
                (out_time / duration * 100.0).clamp(0.0, 100.0) as u8
            }
            _ => self.last_percent,
        };
        let percent = percent.max(self.last_percent);
        self.last_percent = percent;

        let eta = match (self.out_time, self.duration, self.speed) {
            (Some(out_time), Some(duration), Some(speed)) if speed > 0.0 && duration > out_time => {
                Some(format_eta((duration - out_time) / speed))
            }
            _ => None,
        };

        ProgressUpdate {
            percent,
            speed: self.speed.map(|s| format!("{:.2}x", s)),
            eta,
        }
    }
}

pub fn parse_out_time(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours = parts[0].parse::<f64>().ok()?;
    let minutes = parts[1].parse::<f64>().ok()?;
    let seconds = parts[2].parse::<f64>().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

pub fn format_eta(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Drive one conversion to a terminal state, updating the job table as the
/// child process reports progress. Waits for a concurrency slot first;
/// reacts to the stop signal at every await point.
pub(crate) async fn run_conversion(
    tools: Tools,
    spec: ConvertSpec,
    id: String,
    table: Arc<JobTable>,
    limiter: Arc<Semaphore>,
    mut stop: watch::Receiver<bool>,
) {
    let permit = tokio::select! {
        permit = limiter.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
        },
        _ = wait_for_stop(&mut stop) => {
            info!(%id, "conversion stopped while queued");
            table.mark_stopped(&id);
            return;
        }
    };
    let _permit = permit;

    table.set_running(&id);

    // Total duration makes percent meaningful; without it only speed/eta
    // are reported.
    let duration = probe_media(&tools, &spec.input).await.ok().and_then(|m| m.duration);

    let output = output_path(&spec);
    let args = convert_args(&spec, &output);
    debug!(%id, ?args, "starting ffmpeg");

    let mut command = Command::new(&tools.ffmpeg);
    command
        .args(["-progress", "pipe:1", "-nostats"])
        .args(&args)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            table.finish(&id, Err(format!("failed to spawn ffmpeg: {}", e)));
            return;
        }
    };

    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push(line);
            }
            collected
        })
    });

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        let mut tracker = ProgressTracker::new(duration);
        loop {
            tokio::select! {
                _ = wait_for_stop(&mut stop) => {
                    info!(%id, "killing ffmpeg on stop request");
                    let _ = child.kill().await;
                    table.mark_stopped(&id);
                    return;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(update) = tracker.ingest(&line) {
                            table.set_progress(&id, update.percent, update.speed, update.eta);
                        }
                        if line.trim() == "progress=end" {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(%id, "error reading ffmpeg progress: {}", e);
                        break;
                    }
                }
            }
        }
    }

    let status = child.wait().await;
    let stderr_lines = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };

    match status {
        Ok(status) if status.success() => {
            info!(%id, output = %output.display(), "conversion finished");
            table.finish(&id, Ok(()));
        }
        Ok(status) => {
            let tail = stderr_lines
                .iter()
                .rev()
                .find(|l| !l.trim().is_empty())
                .cloned()
                .unwrap_or_default();
            table.finish(
                &id,
                Err(format!("ffmpeg exited with {:?}: {}", status.code(), tail)),
            );
        }
        Err(e) => {
            table.finish(&id, Err(format!("failed to wait for ffmpeg: {}", e)));
        }
    }
}

/// Resolves when the stop flag flips to true (or its sender is gone).
pub(crate) async fn wait_for_stop(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
