//! CPU and bandwidth limits a benchmark run must respect.

use serde::{Deserialize, Serialize};

use crate::advisor::{cap_to_sane_value, max_bitrates_from_upload};
use crate::config::BenchmarkConfig;
use crate::types::{ContentProfile, FrameRate, TargetKind};

/// Upload speed assumed for local file targets, 100 MB/s in Kb/s.
const LOCAL_FILE_UPLOAD_KBPS: f64 = 100.0 * 1024.0 * 8.0;

/// How much of the machine the user is willing to spend on encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuLimit {
    /// About a fifth of the CPU.
    #[default]
    Low,
    /// About two fifths of the CPU.
    Medium,
    /// Most of the CPU, leaving headroom for the system.
    High,
}

impl CpuLimit {
    pub fn fraction(&self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.4,
            Self::High => 0.8,
        }
    }
}

/// What the user told us about their connection and content.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Total upload speed in Kb/s.
    pub upload_kbps: f64,
    /// Latency-sensitive use of the connection alongside the broadcast.
    pub interactive: bool,
    /// Fast-moving content.
    pub high_action: bool,
    /// Whether the service recompresses the stream for viewers.
    pub has_transcoder: bool,
}

/// Limits for a single benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Encoder CPU ceiling, already excluding the reserved share.
    pub max_own_cpu: f64,
    /// System-wide CPU ceiling.
    pub max_system_cpu: f64,
    pub max_video_kbps: u32,
    pub max_audio_kbps: u32,
    pub content: ContentProfile,
    pub target: TargetKind,
}

impl Budget {
    /// Budget for a network broadcast.
    ///
    /// The video ceiling is sized for 60 Hz, the most demanding rate the
    /// benchmark tries.
    pub fn from_upload(upload: &UploadSettings, limit: CpuLimit, config: &BenchmarkConfig) -> Self {
        let split = max_bitrates_from_upload(upload.upload_kbps, upload.interactive);
        let max_video_kbps = cap_to_sane_value(
            split.video_kbps,
            FrameRate::FPS_60,
            upload.high_action,
            upload.has_transcoder,
        );
        Self {
            max_own_cpu: limit.fraction() - config.reserved_cpu,
            max_system_cpu: config.max_system_cpu,
            max_video_kbps,
            max_audio_kbps: split.audio_kbps,
            content: ContentProfile {
                high_action: upload.high_action,
            },
            target: TargetKind::Stream,
        }
    }

    /// Budget for recording to a local file.
    ///
    /// Bandwidth is effectively unlimited and content is assumed to be
    /// high action so the recording keeps its quality when edited later.
    pub fn for_local_file(limit: CpuLimit, config: &BenchmarkConfig) -> Self {
        let split = max_bitrates_from_upload(LOCAL_FILE_UPLOAD_KBPS, false);
        Self {
            max_own_cpu: limit.fraction() - config.reserved_cpu,
            max_system_cpu: config.max_system_cpu,
            max_video_kbps: split.video_kbps,
            max_audio_kbps: split.audio_kbps,
            content: ContentProfile { high_action: true },
            target: TargetKind::File,
        }
    }

    pub fn target_is_local_file(&self) -> bool {
        self.target == TargetKind::File
    }

    /// Whether measured usage breaks this budget.
    pub fn is_exceeded_by(&self, own_cpu: f64, system_cpu: f64) -> bool {
        own_cpu > self.max_own_cpu || system_cpu > self.max_system_cpu
    }
}
