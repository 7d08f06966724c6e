use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use mediamux_engine::catalog::Catalog;
use mediamux_engine::error::BackendError;

use crate::Tools;

/// What the startup checks found on this machine.
#[derive(Debug, Clone)]
pub struct ToolReport {
    pub ffmpeg_version: String,
    /// None when yt-dlp is missing; conversions still work without it.
    pub ytdlp_version: Option<String>,
    /// Hardware encode engine ids the local ffmpeg build provides.
    pub hardware_engines: Vec<String>,
}

impl ToolReport {
    pub fn supports_engine(&self, engine_id: &str) -> bool {
        self.hardware_engines.iter().any(|e| e == engine_id)
    }
}

/// Locate the external tools and record what they can do. ffmpeg is
/// required; yt-dlp is optional.
pub async fn detect_tools(tools: &Tools) -> Result<ToolReport, BackendError> {
    let ffmpeg_version = check_ffmpeg_version(tools).await?;
    let ytdlp_version = check_ytdlp_version(tools).await.ok();
    let hardware_engines = detect_hardware_engines(tools).await.unwrap_or_default();
    debug!(%ffmpeg_version, ?ytdlp_version, ?hardware_engines, "tool detection complete");
    Ok(ToolReport { ffmpeg_version, ytdlp_version, hardware_engines })
}

pub async fn check_ffmpeg_version(tools: &Tools) -> Result<String, BackendError> {
    let output = Command::new(&tools.ffmpeg).arg("-version").output().await.map_err(|e| {
        BackendError::Unavailable(format!(
            "failed to execute {} -version: {}",
            tools.ffmpeg.display(),
            e
        ))
    })?;

    if !output.status.success() {
        return Err(BackendError::Tool("ffmpeg -version failed".to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_version_line(&stdout, "ffmpeg")
        .ok_or_else(|| BackendError::Tool(format!("failed to parse ffmpeg version from: {}", stdout)))
}

pub async fn check_ytdlp_version(tools: &Tools) -> Result<String, BackendError> {
    let output = Command::new(&tools.ytdlp).arg("--version").output().await.map_err(|e| {
        BackendError::Unavailable(format!(
            "failed to execute {} --version: {}",
            tools.ytdlp.display(),
            e
        ))
    })?;

    if !output.status.success() {
        return Err(BackendError::Tool("yt-dlp --version failed".to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Scan `ffmpeg -encoders` for the hardware engines the catalog lists, so
/// unusable engines can be flagged before submission.
pub async fn detect_hardware_engines(tools: &Tools) -> Result<Vec<String>, BackendError> {
    let output = Command::new(&tools.ffmpeg)
        .arg("-hide_banner")
        .arg("-encoders")
        .output()
        .await?;

    if !output.status.success() {
        return Err(BackendError::Tool("ffmpeg -encoders failed".to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(scan_encoder_list(&stdout))
}

pub fn scan_encoder_list(encoder_output: &str) -> Vec<String> {
    Catalog::builtin()
        .hardware_engine_ids()
        .into_iter()
        .filter(|id| encoder_output.contains(id))
        .map(|id| id.to_string())
        .collect()
}

fn parse_version_line(output: &str, tool: &str) -> Option<String> {
    let re = Regex::new(&format!(r"{}\s+version\s+(\S+)", tool)).unwrap();
    re.captures(output).map(|caps| caps[1].to_string())
}
