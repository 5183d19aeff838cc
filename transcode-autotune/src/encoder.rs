//! Trial encoder collaborator.
//!
//! The benchmark only needs an encoder that can be brought up with a given
//! configuration, fed frame ticks and torn down again. [`SoftwareEncoder`]
//! is a self-contained implementation whose per-frame cost scales with the
//! output size and preset like a real block-based video encoder.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ActivationError;
use crate::preset::Preset;
use crate::types::{FrameRate, Resolution};

/// How source frames are fitted into the output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalingMode {
    /// Scale to fit inside the output, snapping to whole-number ratios.
    #[default]
    SnapToInnerScale,
    /// Stretch to fill the output exactly.
    Stretch,
}

/// Filter used when scaling source frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleFilter {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

/// Rate control options for a trial encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderOptions {
    pub bitrate_kbps: u32,
    pub preset: Preset,
    /// Seconds between keyframes. Zero selects the encoder default.
    pub key_interval_secs: u32,
}

/// Everything needed to construct a trial encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub size: Resolution,
    pub scaling: ScalingMode,
    pub filter: ScaleFilter,
    pub frame_rate: FrameRate,
    pub options: EncoderOptions,
}

/// A video encoder that can be run for one benchmark trial.
pub trait TrialEncoder {
    /// Bring the encoder up. Failure is reported, never fatal.
    fn activate(&mut self) -> Result<(), ActivationError>;

    /// Encode the synthetic frame with the given index.
    fn encode_frame(&mut self, frame_index: u64) -> Result<(), ActivationError>;

    /// Release encoder resources. Safe to call more than once.
    fn deactivate(&mut self);

    /// Bitrate the encoder was configured with.
    fn bitrate_kbps(&self) -> u32;
}

/// Constructs trial encoders.
pub trait EncoderFactory {
    type Encoder: TrialEncoder;

    fn create(&self, config: &EncoderConfig) -> Self::Encoder;
}

const BLOCK: usize = 16;
/// SAD is evaluated on every fourth pixel in each direction.
const SUBSAMPLE: usize = 4;
const KEYFRAME_INTERVAL_DEFAULT_SECS: u32 = 2;

/// CPU-bound software encoder used to measure the host machine.
///
/// Each frame renders a moving synthetic luma plane and runs a full-search
/// block motion estimation against the previous frame. The search radius
/// comes from the preset, so slower presets cost more per pixel.
#[derive(Debug)]
pub struct SoftwareEncoder {
    config: EncoderConfig,
    current: Vec<u8>,
    previous: Vec<u8>,
    active: bool,
    frames_encoded: u64,
    keyframes: u64,
    bytes_out: u64,
}

impl SoftwareEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            current: Vec::new(),
            previous: Vec::new(),
            active: false,
            frames_encoded: 0,
            keyframes: 0,
            bytes_out: 0,
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    pub fn keyframes(&self) -> u64 {
        self.keyframes
    }

    /// Bytes the rate controller has budgeted so far.
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    fn keyframe_period(&self) -> u64 {
        let secs = match self.config.options.key_interval_secs {
            0 => KEYFRAME_INTERVAL_DEFAULT_SECS,
            n => n,
        };
        self.config.frame_rate.frames_in(secs as f64).max(1)
    }

    fn render(&mut self, frame_index: u64) {
        let width = self.config.size.width as usize;
        let shift = (frame_index % 256) as usize;
        for (y, row) in self.current.chunks_exact_mut(width).enumerate() {
            for (x, px) in row.iter_mut().enumerate() {
                *px = ((x + shift) ^ (y + shift / 2)) as u8;
            }
        }
    }

    fn motion_search(&self) -> u64 {
        let width = self.config.size.width as usize;
        let height = self.config.size.height as usize;
        let radius = self.config.options.preset.search_radius() as isize;
        let mut total_cost = 0u64;

        for by in (0..height.saturating_sub(BLOCK - 1)).step_by(BLOCK) {
            for bx in (0..width.saturating_sub(BLOCK - 1)).step_by(BLOCK) {
                let mut best = u64::MAX;
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let ry = by as isize + dy;
                        let rx = bx as isize + dx;
                        if ry < 0 || rx < 0 {
                            continue;
                        }
                        let (ry, rx) = (ry as usize, rx as usize);
                        if ry + BLOCK > height || rx + BLOCK > width {
                            continue;
                        }
                        let sad = self.block_sad(bx, by, rx, ry, width);
                        best = best.min(sad);
                    }
                }
                total_cost += best;
            }
        }
        total_cost
    }

    fn block_sad(&self, bx: usize, by: usize, rx: usize, ry: usize, width: usize) -> u64 {
        let mut sad = 0u64;
        for y in (0..BLOCK).step_by(SUBSAMPLE) {
            let cur = (by + y) * width + bx;
            let refr = (ry + y) * width + rx;
            for x in (0..BLOCK).step_by(SUBSAMPLE) {
                sad += self.current[cur + x].abs_diff(self.previous[refr + x]) as u64;
            }
        }
        sad
    }
}

impl TrialEncoder for SoftwareEncoder {
    fn activate(&mut self) -> Result<(), ActivationError> {
        let Resolution { width, height } = self.config.size;
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(ActivationError::UnsupportedSize { width, height });
        }
        if self.config.options.bitrate_kbps == 0 {
            return Err(ActivationError::InvalidBitrate(0));
        }
        if self.config.frame_rate.as_f64() <= 0.0 {
            return Err(ActivationError::Init {
                message: format!("invalid frame rate {}", self.config.frame_rate),
            });
        }
        let plane = width as usize * height as usize;
        self.current = vec![0; plane];
        self.previous = vec![0; plane];
        self.active = true;
        Ok(())
    }

    fn encode_frame(&mut self, frame_index: u64) -> Result<(), ActivationError> {
        if !self.active {
            return Err(ActivationError::Init {
                message: "encoder is not active".into(),
            });
        }
        std::mem::swap(&mut self.current, &mut self.previous);
        self.render(frame_index);

        let is_keyframe = self.frames_encoded % self.keyframe_period() == 0;
        let cost = if is_keyframe {
            self.keyframes += 1;
            0
        } else {
            self.motion_search()
        };
        let frame_bytes =
            self.config.options.bitrate_kbps as f64 * 125.0 / self.config.frame_rate.as_f64();
        self.bytes_out += frame_bytes as u64;
        self.frames_encoded += 1;
        trace!(frame_index, is_keyframe, cost, "Encoded trial frame");
        Ok(())
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.current = Vec::new();
        self.previous = Vec::new();
    }

    fn bitrate_kbps(&self) -> u32 {
        self.config.options.bitrate_kbps
    }
}

/// Factory for [`SoftwareEncoder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareEncoderFactory;

impl EncoderFactory for SoftwareEncoderFactory {
    type Encoder = SoftwareEncoder;

    fn create(&self, config: &EncoderConfig) -> SoftwareEncoder {
        SoftwareEncoder::new(*config)
    }
}
