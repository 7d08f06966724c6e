use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use mediamux_engine::backend::{RemoteFormat, RemoteInfo};
use mediamux_engine::catalog::DOWNLOAD_CONTAINERS;
use mediamux_engine::error::BackendError;
use mediamux_engine::jobs::DownloadSpec;

use crate::ffmpeg::wait_for_stop;
use crate::store::JobTable;
use crate::Tools;

// Internal yt-dlp JSON structures
#[derive(Debug, Deserialize)]
struct RawInfo {
    id: String,
    title: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    ext: Option<String>,
    format_note: Option<String>,
    resolution: Option<String>,
    filesize: Option<u64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    tbr: Option<f64>,
}

/// Probe a URL with `yt-dlp -J`. An answer without any formats is a
/// NotFound-class failure: there is nothing submittable in it.
pub async fn fetch_remote_info(tools: &Tools, url: &str) -> Result<RemoteInfo, BackendError> {
    let output = Command::new(&tools.ytdlp)
        .arg("-J")
        .arg("--no-warnings")
        .arg(url)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("yt-dlp failed")
            .to_string();
        return Err(BackendError::Tool(reason));
    }

    let info = parse_remote_info(&String::from_utf8_lossy(&output.stdout))?;
    if info.formats.is_empty() {
        return Err(BackendError::NotFound(format!("no downloadable formats for {}", url)));
    }
    Ok(info)
}

pub fn parse_remote_info(json: &str) -> Result<RemoteInfo, BackendError> {
    let raw: RawInfo = serde_json::from_str(json)
        .map_err(|e| BackendError::Tool(format!("unreadable yt-dlp output: {}", e)))?;

    Ok(RemoteInfo {
        title: raw.title.unwrap_or_else(|| raw.id.clone()),
        id: raw.id,
        formats: raw
            .formats
            .into_iter()
            .map(|f| RemoteFormat {
                format_id: f.format_id,
                ext: f.ext,
                format_note: f.format_note,
                resolution: f.resolution,
                filesize: f.filesize,
                vcodec: f.vcodec,
                acodec: f.acodec,
                tbr: f.tbr,
            })
            .collect(),
        thumbnail: raw.thumbnail,
        duration: raw.duration,
        uploader: raw.uploader,
    })
}

/// Build the yt-dlp argument list for a resolved download.
pub fn download_args(spec: &DownloadSpec) -> Vec<String> {
    let template = spec.output_dir.join("%(title)s.%(ext)s");
    let mut args: Vec<String> = vec![
        "--progress".to_string(),
        "--newline".to_string(),
        "--no-warnings".to_string(),
        "-f".to_string(),
        spec.format_id.clone(),
    ];
    if DOWNLOAD_CONTAINERS.contains(&spec.container.as_str()) {
        args.push("--merge-output-format".to_string());
        args.push(spec.container.clone());
    }
    args.push("-o".to_string());
    args.push(template.display().to_string());
    args.push(spec.url.clone());
    args
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub percent: u8,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

pub fn progress_regex() -> Regex {
    // e.g. "[download]  42.5% of 120.53MiB at 2.30MiB/s ETA 00:31"
    Regex::new(r"\[download\]\s+([\d.]+)%\s+of\s+~?\s*(\S+)\s+at\s+(\S+)\s+ETA\s+(\S+)").unwrap()
}

pub fn parse_progress(re: &Regex, line: &str) -> Option<DownloadProgress> {
    let captures = re.captures(line)?;
    let percent = captures[1].parse::<f64>().ok()?.clamp(0.0, 100.0) as u8;
    let speed = &captures[3];
    let eta = &captures[4];
    Some(DownloadProgress {
        percent,
        speed: (speed != "Unknown").then(|| speed.to_string()),
        eta: (eta != "Unknown").then(|| eta.to_string()),
    })
}

/// Drive one download to a terminal state, updating the job table as
/// yt-dlp reports progress.
pub(crate) async fn run_download(
    tools: Tools,
    spec: DownloadSpec,
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
            info!(%id, "download stopped while queued");
            table.mark_stopped(&id);
            return;
        }
    };
    let _permit = permit;

    table.set_running(&id);

    let args = download_args(&spec);
    debug!(%id, ?args, "starting yt-dlp");

    let mut command = Command::new(&tools.ytdlp);
    command
        .args(&args)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            table.finish(&id, Err(format!("failed to spawn yt-dlp: {}", e)));
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

    let mut reported_error: Option<String> = None;
    if let Some(stdout) = child.stdout.take() {
        let re = progress_regex();
        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                _ = wait_for_stop(&mut stop) => {
                    info!(%id, "killing yt-dlp on stop request");
                    let _ = child.kill().await;
                    table.mark_stopped(&id);
                    return;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(update) = parse_progress(&re, &line) {
                            let percent = update.percent;
                            table.set_progress(&id, percent, update.speed, update.eta);
                        } else if let Some(message) = line.trim().strip_prefix("ERROR:") {
                            reported_error = Some(message.trim().to_string());
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(%id, "error reading yt-dlp output: {}", e);
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
            info!(%id, "download finished");
            table.finish(&id, Ok(()));
        }
        Ok(status) => {
            let message = reported_error.unwrap_or_else(|| {
                stderr_lines
                    .iter()
                    .rev()
                    .find(|l| !l.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("yt-dlp exited with {:?}", status.code()))
            });
            table.finish(&id, Err(message));
        }
        Err(e) => {
            table.finish(&id, Err(format!("failed to wait for yt-dlp: {}", e)));
        }
    }
}
