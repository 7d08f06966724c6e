use serde::{Deserialize, Serialize};
use std::path::Path;

/// Input extensions the conversion form accepts.
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "mp3", "wav", "aac", "flac", "m4a",
];

/// Selectable audio bitrates (kbps) for downloads.
pub const DOWNLOAD_AUDIO_QUALITIES: &[&str] = &["64", "128", "192", "256", "320"];

/// Selectable video heights for downloads.
pub const DOWNLOAD_VIDEO_QUALITIES: &[&str] = &["480", "720", "1080", "1440", "2160"];

/// Containers a download may be remuxed into.
pub const DOWNLOAD_CONTAINERS: &[&str] = &["mp4", "mkv", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareClass {
    Software,
    Qsv,
    Nvenc,
    Amf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engine {
    pub id: &'static str,
    pub label: &'static str,
    pub hardware: HardwareClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    pub id: &'static str,
    pub label: &'static str,
    pub media_kind: MediaKind,
    pub engines: &'static [Engine],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Container {
    pub id: &'static str,
    pub label: &'static str,
    pub media_kind: MediaKind,
    pub description: &'static str,
    pub extension: &'static str,
}

/// Quality preset selector. `Custom` has no preset values; the user's own
/// bitrate/resolution/sample-rate entries are used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    High,
    Medium,
    Low,
    Custom,
}

impl Quality {
    pub fn from_id(id: &str) -> Option<Quality> {
        match id {
            "high" => Some(Quality::High),
            "medium" => Some(Quality::Medium),
            "low" => Some(Quality::Low),
            "custom" => Some(Quality::Custom),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::High => "high",
            Quality::Medium => "medium",
            Quality::Low => "low",
            Quality::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPreset {
    pub quality: Quality,
    pub video_bitrate: &'static str,
    pub audio_bitrate: &'static str,
    pub resolution: &'static str,
    pub sample_rate: &'static str,
}

const CONTAINERS: &[Container] = &[
    Container {
        id: "mp4",
        label: "MP4",
        media_kind: MediaKind::Video,
        description: "MPEG-4 Part 14",
        extension: "mp4",
    },
    Container {
        id: "mkv",
        label: "MKV",
        media_kind: MediaKind::Video,
        description: "Matroska Video",
        extension: "mkv",
    },
    Container {
        id: "mp3",
        label: "MP3",
        media_kind: MediaKind::Audio,
        description: "MPEG Audio Layer III",
        extension: "mp3",
    },
    Container {
        id: "wav",
        label: "WAV",
        media_kind: MediaKind::Audio,
        description: "Waveform Audio File Format",
        extension: "wav",
    },
];

const VIDEO_CODECS: &[Codec] = &[
    Codec {
        id: "h264",
        label: "H.264/AVC",
        media_kind: MediaKind::Video,
        engines: &[
            Engine { id: "libx264", label: "x264", hardware: HardwareClass::Software },
            Engine { id: "h264_qsv", label: "QSV", hardware: HardwareClass::Qsv },
            Engine { id: "h264_nvenc", label: "NVENC", hardware: HardwareClass::Nvenc },
            Engine { id: "h264_amf", label: "AMF", hardware: HardwareClass::Amf },
        ],
    },
    Codec {
        id: "hevc",
        label: "H.265/HEVC",
        media_kind: MediaKind::Video,
        engines: &[
            Engine { id: "libx265", label: "x265", hardware: HardwareClass::Software },
            Engine { id: "hevc_qsv", label: "QSV", hardware: HardwareClass::Qsv },
            Engine { id: "hevc_nvenc", label: "NVENC", hardware: HardwareClass::Nvenc },
            Engine { id: "hevc_amf", label: "AMF", hardware: HardwareClass::Amf },
        ],
    },
    Codec {
        id: "av1",
        label: "AV1",
        media_kind: MediaKind::Video,
        engines: &[
            Engine { id: "libsvtav1", label: "SVT-AV1", hardware: HardwareClass::Software },
            Engine { id: "libaom-av1", label: "AOM", hardware: HardwareClass::Software },
            Engine { id: "av1_qsv", label: "QSV", hardware: HardwareClass::Qsv },
        ],
    },
];

const AUDIO_CODECS: &[Codec] = &[
    Codec {
        id: "aac",
        label: "AAC",
        media_kind: MediaKind::Audio,
        engines: &[Engine { id: "aac", label: "AAC", hardware: HardwareClass::Software }],
    },
    Codec {
        id: "opus",
        label: "Opus",
        media_kind: MediaKind::Audio,
        engines: &[Engine { id: "libopus", label: "Opus", hardware: HardwareClass::Software }],
    },
    Codec {
        id: "mp3",
        label: "MP3",
        media_kind: MediaKind::Audio,
        engines: &[Engine { id: "libmp3lame", label: "LAME", hardware: HardwareClass::Software }],
    },
    Codec {
        id: "ac3",
        label: "AC3",
        media_kind: MediaKind::Audio,
        engines: &[Engine { id: "ac3", label: "AC3", hardware: HardwareClass::Software }],
    },
    Codec {
        id: "eac3",
        label: "E-AC3",
        media_kind: MediaKind::Audio,
        engines: &[Engine { id: "eac3", label: "E-AC3", hardware: HardwareClass::Software }],
    },
    Codec {
        id: "flac",
        label: "FLAC",
        media_kind: MediaKind::Audio,
        engines: &[Engine { id: "flac", label: "FLAC", hardware: HardwareClass::Software }],
    },
    Codec {
        id: "alac",
        label: "ALAC",
        media_kind: MediaKind::Audio,
        engines: &[Engine { id: "alac", label: "ALAC", hardware: HardwareClass::Software }],
    },
];

const QUALITY_PRESETS: &[QualityPreset] = &[
    QualityPreset {
        quality: Quality::High,
        video_bitrate: "5000k",
        audio_bitrate: "320k",
        resolution: "1920x1080",
        sample_rate: "48000",
    },
    QualityPreset {
        quality: Quality::Medium,
        video_bitrate: "2500k",
        audio_bitrate: "192k",
        resolution: "1280x720",
        sample_rate: "44100",
    },
    QualityPreset {
        quality: Quality::Low,
        video_bitrate: "1000k",
        audio_bitrate: "128k",
        resolution: "854x480",
        sample_rate: "44100",
    },
];

/// Static registry of containers, codecs, encode engines and quality
/// presets. Built once at startup, read-only afterwards. Lookups for
/// unknown ids return empty slices or None; callers treat empty as "no
/// valid choice" and block submission.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    containers: &'static [Container],
    video_codecs: &'static [Codec],
    audio_codecs: &'static [Codec],
    presets: &'static [QualityPreset],
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Catalog {
        Catalog {
            containers: CONTAINERS,
            video_codecs: VIDEO_CODECS,
            audio_codecs: AUDIO_CODECS,
            presets: QUALITY_PRESETS,
        }
    }

    pub fn containers(&self) -> &'static [Container] {
        self.containers
    }

    pub fn containers_of(&self, kind: MediaKind) -> Vec<&'static Container> {
        self.containers.iter().filter(|c| c.media_kind == kind).collect()
    }

    pub fn container(&self, id: &str) -> Option<&'static Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    /// Codecs applicable to a container's media kind. Empty for unknown
    /// container ids.
    pub fn codecs_of(&self, container_id: &str) -> &'static [Codec] {
        match self.container(container_id) {
            Some(container) => self.codecs(container.media_kind),
            None => &[],
        }
    }

    pub fn codecs(&self, kind: MediaKind) -> &'static [Codec] {
        match kind {
            MediaKind::Video => self.video_codecs,
            MediaKind::Audio => self.audio_codecs,
        }
    }

    pub fn codec(&self, id: &str) -> Option<&'static Codec> {
        self.video_codecs
            .iter()
            .chain(self.audio_codecs.iter())
            .find(|c| c.id == id)
    }

    /// Engines of a codec. Empty for unknown codec ids.
    pub fn engines_of(&self, codec_id: &str) -> &'static [Engine] {
        self.codec(codec_id).map(|c| c.engines).unwrap_or(&[])
    }

    /// Preset values for a quality selector; None for `Custom`.
    pub fn preset_of(&self, quality: Quality) -> Option<&'static QualityPreset> {
        self.presets.iter().find(|p| p.quality == quality)
    }

    /// Every engine id the catalog maps to a hardware encoder, for startup
    /// availability checks.
    pub fn hardware_engine_ids(&self) -> Vec<&'static str> {
        self.video_codecs
            .iter()
            .flat_map(|c| c.engines.iter())
            .filter(|e| e.hardware != HardwareClass::Software)
            .map(|e| e.id)
            .collect()
    }
}

/// Whether the conversion form accepts this file as input.
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_lowercase();
            SUPPORTED_INPUT_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}
