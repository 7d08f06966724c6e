use std::path::PathBuf;

use crate::backend::{Metadata, RemoteInfo};
use crate::catalog::{Catalog, MediaKind, Quality};
use crate::error::SelectionError;
use crate::jobs::{AudioParams, ConvertSpec, DownloadSpec, VideoParams};

/// Accumulated form state for a conversion. Dependent defaults (container
/// → codec → engine) are pure transitions on this value, so the whole
/// resolver is testable without any UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertSelection {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub container: Option<String>,
    pub quality: Quality,
    pub video_codec: Option<String>,
    pub video_engine: Option<String>,
    pub audio_codec: Option<String>,
    pub audio_engine: Option<String>,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub resolution: String,
    pub framerate: String,
    pub sample_rate: String,
    pub channels: String,
}

impl Default for ConvertSelection {
    fn default() -> Self {
        ConvertSelection {
            source: None,
            destination: None,
            container: None,
            quality: Quality::High,
            video_codec: None,
            video_engine: None,
            audio_codec: None,
            audio_engine: None,
            video_bitrate: String::new(),
            audio_bitrate: String::new(),
            resolution: String::new(),
            framerate: String::new(),
            sample_rate: "48000".to_string(),
            channels: "2".to_string(),
        }
    }
}

impl ConvertSelection {
    pub fn set_source(&mut self, path: PathBuf) {
        self.source = Some(path);
    }

    pub fn set_destination(&mut self, dir: PathBuf) {
        self.destination = Some(dir);
    }

    /// Seed the resolution field from a probed file.
    pub fn apply_metadata(&mut self, metadata: &Metadata) {
        if let (Some(width), Some(height)) = (metadata.width, metadata.height) {
            self.resolution = format!("{}x{}", width, height);
        }
    }

    /// Selecting a container resets codec/engine choices to the catalog's
    /// deterministic defaults for that container's media kind. Audio-only
    /// containers clear the video choices entirely.
    pub fn choose_container(&mut self, catalog: &Catalog, container_id: &str) {
        self.container = Some(container_id.to_string());

        match catalog.container(container_id) {
            Some(container) => {
                if container.media_kind == MediaKind::Video {
                    let first = catalog.codecs(MediaKind::Video).first();
                    self.video_codec = first.map(|c| c.id.to_string());
                    self.video_engine =
                        first.and_then(|c| c.engines.first()).map(|e| e.id.to_string());
                } else {
                    self.video_codec = None;
                    self.video_engine = None;
                }
                let first_audio = catalog.codecs(MediaKind::Audio).first();
                self.audio_codec = first_audio.map(|c| c.id.to_string());
                self.audio_engine =
                    first_audio.and_then(|c| c.engines.first()).map(|e| e.id.to_string());
            }
            None => {
                self.video_codec = None;
                self.video_engine = None;
                self.audio_codec = None;
                self.audio_engine = None;
            }
        }
    }

    /// Selecting a codec resets the engine to that codec's first engine.
    pub fn choose_video_codec(&mut self, catalog: &Catalog, codec_id: &str) {
        self.video_codec = Some(codec_id.to_string());
        self.video_engine = catalog.engines_of(codec_id).first().map(|e| e.id.to_string());
    }

    pub fn choose_video_engine(&mut self, engine_id: &str) {
        self.video_engine = Some(engine_id.to_string());
    }

    pub fn choose_audio_codec(&mut self, catalog: &Catalog, codec_id: &str) {
        self.audio_codec = Some(codec_id.to_string());
        self.audio_engine = catalog.engines_of(codec_id).first().map(|e| e.id.to_string());
    }

    pub fn choose_audio_engine(&mut self, engine_id: &str) {
        self.audio_engine = Some(engine_id.to_string());
    }

    /// Applying a non-custom preset overwrites the quality fields with the
    /// preset's fixed values; applying it again is a no-op. `Custom`
    /// leaves the last user-entered values untouched.
    pub fn choose_quality(&mut self, catalog: &Catalog, quality: Quality) {
        self.quality = quality;
        if let Some(preset) = catalog.preset_of(quality) {
            self.video_bitrate = preset.video_bitrate.to_string();
            self.audio_bitrate = preset.audio_bitrate.to_string();
            self.resolution = preset.resolution.to_string();
            self.sample_rate = preset.sample_rate.to_string();
        }
    }

    /// Produce a backend-submittable spec, or the first unmet requirement
    /// in fixed order: source, then format, then destination.
    pub fn resolve(&self, catalog: &Catalog) -> Result<ConvertSpec, SelectionError> {
        let input = self.source.clone().ok_or(SelectionError::MissingSource)?;
        let container_id = self.container.clone().ok_or(SelectionError::MissingFormat)?;
        let output_dir = self.destination.clone().ok_or(SelectionError::MissingDestination)?;

        let container = catalog.container(&container_id).ok_or_else(|| {
            SelectionError::Resolution(format!("unknown container '{}'", container_id))
        })?;

        // Non-custom presets resolve deterministically regardless of what
        // the fields were edited to in between.
        let (video_bitrate, audio_bitrate, resolution, sample_rate) =
            match catalog.preset_of(self.quality) {
                Some(preset) => (
                    preset.video_bitrate.to_string(),
                    preset.audio_bitrate.to_string(),
                    preset.resolution.to_string(),
                    preset.sample_rate.to_string(),
                ),
                None => (
                    self.video_bitrate.clone(),
                    self.audio_bitrate.clone(),
                    self.resolution.clone(),
                    self.sample_rate.clone(),
                ),
            };

        let video = if container.media_kind == MediaKind::Video {
            let codec = self
                .video_codec
                .clone()
                .ok_or_else(|| SelectionError::Resolution("no video codec selected".into()))?;
            let engine = self
                .video_engine
                .clone()
                .ok_or_else(|| SelectionError::Resolution("no video engine selected".into()))?;
            validate_engine(catalog, &codec, &engine)?;
            Some(VideoParams {
                codec,
                engine,
                bitrate: video_bitrate,
                resolution,
                framerate: if self.framerate.is_empty() {
                    None
                } else {
                    Some(self.framerate.clone())
                },
            })
        } else {
            None
        };

        let audio_codec = self
            .audio_codec
            .clone()
            .ok_or_else(|| SelectionError::Resolution("no audio codec selected".into()))?;
        let audio_engine = self
            .audio_engine
            .clone()
            .ok_or_else(|| SelectionError::Resolution("no audio engine selected".into()))?;
        validate_engine(catalog, &audio_codec, &audio_engine)?;

        Ok(ConvertSpec {
            input,
            output_dir,
            container: container_id,
            quality: self.quality,
            video,
            audio: AudioParams {
                codec: audio_codec,
                engine: audio_engine,
                bitrate: audio_bitrate,
                sample_rate,
                channels: self.channels.clone(),
            },
        })
    }
}

fn validate_engine(catalog: &Catalog, codec_id: &str, engine_id: &str) -> Result<(), SelectionError> {
    let engines = catalog.engines_of(codec_id);
    if engines.is_empty() {
        return Err(SelectionError::Resolution(format!("unknown codec '{}'", codec_id)));
    }
    if !engines.iter().any(|e| e.id == engine_id) {
        return Err(SelectionError::Resolution(format!(
            "engine '{}' is not available for codec '{}'",
            engine_id, codec_id
        )));
    }
    Ok(())
}

/// Accumulated form state for a download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSelection {
    pub url: Option<String>,
    pub destination: Option<PathBuf>,
    pub format_id: Option<String>,
    pub audio_quality: String,
    pub video_quality: String,
    pub container: String,
}

impl Default for DownloadSelection {
    fn default() -> Self {
        DownloadSelection {
            url: None,
            destination: None,
            format_id: None,
            audio_quality: "192".to_string(),
            video_quality: "1080".to_string(),
            container: "mp4".to_string(),
        }
    }
}

impl DownloadSelection {
    pub fn set_url(&mut self, url: &str) {
        let trimmed = url.trim();
        self.url = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
    }

    pub fn set_destination(&mut self, dir: PathBuf) {
        self.destination = Some(dir);
    }

    /// Default to the first reported format, matching the form's initial
    /// selection after a successful metadata fetch.
    pub fn apply_remote_info(&mut self, info: &RemoteInfo) {
        if self.format_id.is_none() {
            self.format_id = info.formats.first().map(|f| f.format_id.clone());
        }
    }

    pub fn resolve(&self) -> Result<DownloadSpec, SelectionError> {
        let url = self.url.clone().ok_or(SelectionError::MissingSource)?;
        let format_id = self.format_id.clone().ok_or(SelectionError::MissingFormat)?;
        let output_dir = self.destination.clone().ok_or(SelectionError::MissingDestination)?;

        Ok(DownloadSpec {
            url,
            output_dir,
            format_id,
            container: self.container.clone(),
            audio_quality: self.audio_quality.clone(),
            video_quality: self.video_quality.clone(),
        })
    }
}
