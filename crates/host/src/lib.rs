// Authoritative backend: drives external ffmpeg/ffprobe/yt-dlp processes
// and owns the job table the engine reconciles against.

pub mod backend;
pub mod detect;
pub mod ffmpeg;
pub mod store;
pub mod ytdlp;

pub use backend::HostBackend;
pub use detect::{detect_tools, ToolReport};

use mediamux_engine::AppConfig;
use std::path::PathBuf;

/// Locations of the external tools the host spawns.
#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub ytdlp: PathBuf,
}

impl Tools {
    pub fn from_config(config: &AppConfig) -> Tools {
        Tools {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            ytdlp: config.ytdlp_path.clone(),
        }
    }
}
