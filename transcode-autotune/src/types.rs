//! Value types shared by the search engine, advisor and ranker.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::preset::Preset;

/// Output video size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Index of this size in [`STANDARD_SIZES`], if it is one of them.
    pub fn height_tier(&self) -> Option<usize> {
        STANDARD_SIZES.iter().position(|s| s == self)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Output sizes considered by the benchmark and the advisor, smallest first.
pub const STANDARD_SIZES: [Resolution; 6] = [
    Resolution::new(426, 240),
    Resolution::new(640, 360),
    Resolution::new(854, 480),
    Resolution::new(960, 540),
    Resolution::new(1280, 720),
    Resolution::new(1920, 1080),
];

/// Output frame rate as a rational number of frames per second.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    /// Must be non-zero.
    pub den: u32,
}

impl FrameRate {
    pub const FPS_30: FrameRate = FrameRate { num: 30, den: 1 };
    pub const FPS_60: FrameRate = FrameRate { num: 60, den: 1 };

    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub const fn from_int(fps: u32) -> Self {
        Self { num: fps, den: 1 }
    }

    /// Frames per second. Zero for a degenerate denominator.
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f64 / self.den as f64
    }

    /// Number of frames covering `secs` seconds, rounded up.
    pub fn frames_in(&self, secs: f64) -> u64 {
        (secs * self.as_f64()).ceil().max(0.0) as u64
    }
}

impl PartialEq for FrameRate {
    fn eq(&self, other: &Self) -> bool {
        self.num as u64 * other.den as u64 == other.num as u64 * self.den as u64
    }
}

impl Eq for FrameRate {}

impl fmt::Debug for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameRate({}/{})", self.num, self.den)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Kind of output the recommended settings will feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Local recording; quality is favoured over bandwidth.
    File,
    /// Network broadcast limited by upload bandwidth.
    #[default]
    Stream,
}

/// Characteristics of the content being broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentProfile {
    /// Fast-moving content (games, sports) needing more bits per pixel.
    pub high_action: bool,
}

/// Parameters of one benchmark trial. Immutable once the trial starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub preset: Preset,
    pub size: Resolution,
    pub frame_rate: FrameRate,
    pub bitrate_kbps: u32,
}

/// Outcome of a trial that stayed within the CPU budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub preset: Preset,
    pub size: Resolution,
    pub frame_rate: FrameRate,
    pub bitrate_kbps: u32,
    /// Average system-wide CPU usage during sampling, 0.0 - 1.0.
    pub system_avg_cpu: f64,
    /// Average CPU usage of this process during sampling, 0.0 - 1.0.
    pub own_avg_cpu: f64,
    pub recommended: bool,
}

impl TrialResult {
    /// Human-readable summary, e.g. `720p, 30 fps, 1,700 Kb/s, Great quality - 30% CPU usage`.
    ///
    /// `reserved_cpu` is added back to the measured usage so the figure
    /// reflects the whole application rather than only the encoder.
    pub fn describe(&self, reserved_cpu: f64) -> String {
        let cpu = ((self.own_avg_cpu + reserved_cpu) * 100.0).round() as i64;
        let mut text = format!(
            "{}p, {} fps, {} Kb/s, {} - {}% CPU usage",
            self.size.height,
            self.frame_rate.as_f64().round() as i64,
            group_thousands(self.bitrate_kbps),
            self.preset.quality_label(),
            cpu
        );
        if self.recommended {
            text.push_str(" (Recommended)");
        }
        text
    }
}

fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
