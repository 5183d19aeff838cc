//! Bitrate and output size heuristics.
//!
//! Everything here is a pure function of its arguments. The central model
//! is a "bits per pixel per frame" value that shrinks slightly as the
//! resolution and frame rate grow, since larger frames and smaller
//! inter-frame motion compress better. Current low action output:
//!
//! | fps | 240p | 360p | 480p | 540p | 720p | 1080p |
//! |-----|------|------|------|------|------|-------|
//! | 30  | 200  | 500  | 800  | 1000 | 1700 | 3200  |
//! | 60  | 250  | 550  | 1000 | 1200 | 2100 | 3800  |
//!
//! High action output:
//!
//! | fps | 240p | 360p | 480p | 540p | 720p | 1080p |
//! |-----|------|------|------|------|------|-------|
//! | 30  | 350  | 800  | 1300 | 1700 | 2800 | 5200  |
//! | 60  | 400  | 950  | 1600 | 2000 | 3400 | 6300  |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{FrameRate, Resolution, TargetKind, STANDARD_SIZES};

/// Smallest video bitrate ever recommended.
pub const MIN_VIDEO_BITRATE_KBPS: u32 = 100;

/// Video bitrate ceiling when no downstream transcoder exists, roughly the
/// download speed of most viewers.
pub const NO_TRANSCODER_MAX_KBPS: u32 = 2500;

const PIXELS_360P: f64 = 230_400.0;
const PIXELS_1080P: f64 = 2_073_600.0;

/// Round to a human-readable value: nearest 50 Kb/s up to 1000 Kb/s,
/// nearest 100 Kb/s above.
pub fn round_bitrate(kbps: f64) -> u32 {
    if !kbps.is_finite() || kbps <= 0.0 {
        return 0;
    }
    let step = if kbps <= 1000.0 { 50.0 } else { 100.0 };
    ((kbps / step).round() * step) as u32
}

/// Recommended video bitrate for the given output conditions.
pub fn ideal_bitrate_kbps(size: Resolution, frame_rate: FrameRate, high_action: bool) -> u32 {
    let area = size.pixels() as f64;
    let base_per_frame = area * if high_action { 0.090 } else { 0.055 };
    let fps = frame_rate.as_f64().max(15.0);
    let px_multiplier = 1.0 - (area - PIXELS_360P) / (PIXELS_1080P - PIXELS_360P) * 0.25;
    let fps_multiplier = (fps - 15.0) * (0.75 - 1.5) / (60.0 - 15.0) + 1.5;
    let bits_per_frame = base_per_frame * px_multiplier * fps_multiplier;
    round_bitrate(bits_per_frame * fps * 0.001)
}

/// Best AAC bitrate to pair with a video bitrate.
pub fn audio_bitrate_for_video(video_kbps: u32) -> u32 {
    match video_kbps {
        0..=299 => 32,
        300..=549 => 64,
        550..=699 => 96,
        _ => 128,
    }
}

/// Maximum video and audio bitrates for an upload budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBitrates {
    pub video_kbps: u32,
    pub audio_kbps: u32,
}

/// Split the available upload bandwidth between video and audio.
///
/// Interactive content (e.g. playing an online game while broadcasting)
/// leaves a larger share of the connection to the rest of the machine.
pub fn max_bitrates_from_upload(upload_kbps: f64, interactive: bool) -> UploadBitrates {
    let share = if interactive { 0.55 } else { 0.70 };
    let video_kbps = round_bitrate(upload_kbps * share).max(MIN_VIDEO_BITRATE_KBPS);
    UploadBitrates {
        video_kbps,
        audio_kbps: audio_bitrate_for_video(video_kbps),
    }
}

/// Clamp a video bitrate to a value that still yields a visible benefit.
///
/// The ceiling is 105% of the 1080p recommendation for the frame rate and
/// content type. Without a downstream transcoder the bitrate is also held
/// under [`NO_TRANSCODER_MAX_KBPS`].
pub fn cap_to_sane_value(
    kbps: u32,
    frame_rate: FrameRate,
    high_action: bool,
    has_transcoder: bool,
) -> u32 {
    let mut kbps = kbps;
    if !has_transcoder {
        kbps = kbps.min(NO_TRANSCODER_MAX_KBPS);
    }
    let top = ideal_bitrate_kbps(STANDARD_SIZES[5], frame_rate, high_action);
    let ceiling = round_bitrate((top as f64 * 1.05).trunc());
    kbps.min(ceiling)
}

/// Best output size for a bitrate, never outside 240p - 1080p.
///
/// Picks the largest standard size whose recommended bitrate is within
/// 80% of the input, so rounding up only costs a minor quality loss.
pub fn best_size_for_bitrate(kbps: u32, frame_rate: FrameRate, high_action: bool) -> Resolution {
    STANDARD_SIZES
        .iter()
        .rev()
        .find(|size| {
            let ideal = ideal_bitrate_kbps(**size, frame_rate, high_action);
            kbps as f64 > ideal as f64 * 0.8
        })
        .copied()
        .unwrap_or(STANDARD_SIZES[0])
}

/// Bitrate decision for one benchmark trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialBitrate {
    /// Run the trial at this bitrate.
    Use(u32),
    /// The size does not fit the upload budget; do not try it.
    Skip,
}

/// Scale an ideal bitrate into the bitrate a trial is run at.
///
/// Local files get three times the ideal. Otherwise the smallest size is
/// the last resort and gets 145%; larger sizes get 125% unless even 75%
/// would exceed the upload ceiling, in which case they are skipped. The
/// result is rounded and clamped to `max_video_kbps`.
pub fn trial_bitrate(
    ideal_kbps: u32,
    is_smallest_size: bool,
    target: TargetKind,
    max_video_kbps: u32,
) -> TrialBitrate {
    let ideal = ideal_kbps as f64;
    let scaled = match target {
        TargetKind::File => ideal * 3.0,
        TargetKind::Stream if is_smallest_size => ideal * 1.45,
        TargetKind::Stream => {
            if ideal * 0.75 > max_video_kbps as f64 {
                return TrialBitrate::Skip;
            }
            ideal * 1.25
        }
    };
    TrialBitrate::Use(round_bitrate(scaled).min(max_video_kbps))
}

/// Units a user may enter their upload speed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UploadUnit {
    /// Kilobits per second.
    #[default]
    Kbps,
    /// Megabits per second.
    Mbps,
    /// Kilobytes per second.
    KBps,
    /// Megabytes per second.
    MBps,
}

impl UploadUnit {
    /// Convert a speed in this unit to Kb/s.
    pub fn to_kbps(&self, value: f64) -> f64 {
        let multiplier = match self {
            Self::Kbps => 1.0,
            Self::Mbps => 1000.0,
            Self::KBps => 1024.0 * 8.0 / 1000.0,
            Self::MBps => 1024.0 * 1024.0 * 8.0 / 1000.0,
        };
        value * multiplier
    }
}

impl FromStr for UploadUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Case matters: "kbps" is bits, "KBps" is bytes.
        match s.trim() {
            "kbps" | "Kbps" | "kb/s" | "Kb/s" => Ok(Self::Kbps),
            "mbps" | "Mbps" | "mb/s" | "Mb/s" => Ok(Self::Mbps),
            "KBps" | "KB/s" => Ok(Self::KBps),
            "MBps" | "MB/s" => Ok(Self::MBps),
            other => Err(format!("unknown upload unit: {other}")),
        }
    }
}
