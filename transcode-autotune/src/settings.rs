//! Turning a chosen trial result into output settings.

use serde::{Deserialize, Serialize};

use crate::budget::Budget;
use crate::encoder::EncoderOptions;
use crate::error::{Error, Result};
use crate::types::{FrameRate, Resolution, TrialResult};

/// Output configuration derived from a benchmark result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedSettings {
    /// Compositing canvas. Never below 720p to avoid scaling artifacts.
    pub canvas: Resolution,
    /// Encoded output size.
    pub output_size: Resolution,
    pub frame_rate: FrameRate,
    pub video: EncoderOptions,
    pub audio_bitrate_kbps: u32,
}

impl RecommendedSettings {
    pub fn from_result(result: &TrialResult, budget: &Budget) -> Self {
        let canvas = if result.size.height <= 720 {
            Resolution::new(1280, 720)
        } else {
            Resolution::new(1920, 1080)
        };
        Self {
            canvas,
            output_size: result.size,
            frame_rate: result.frame_rate,
            video: EncoderOptions {
                bitrate_kbps: result.bitrate_kbps,
                preset: result.preset,
                key_interval_secs: 0,
            },
            audio_bitrate_kbps: budget.max_audio_kbps,
        }
    }
}

/// Final state of a benchmark run, handed to whoever presents the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOutcome {
    pub budget: Budget,
    /// Accepted trials in completion order.
    pub results: Vec<TrialResult>,
    /// Index of the ranker's pick, if any result qualified.
    pub recommended: Option<usize>,
}

impl BenchmarkOutcome {
    /// True when no combination fit the budget.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Settings for the result at `index`, as chosen by the user.
    pub fn select(&self, index: usize) -> Result<RecommendedSettings> {
        let result = self.results.get(index).ok_or(Error::NoSuchResult {
            index,
            len: self.results.len(),
        })?;
        Ok(RecommendedSettings::from_result(result, &self.budget))
    }

    /// Settings for the ranker's pick.
    pub fn recommended_settings(&self) -> Option<RecommendedSettings> {
        let index = self.recommended?;
        self.select(index).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::CpuLimit;
    use crate::config::BenchmarkConfig;
    use crate::preset::Preset;

    fn result(height: u32, recommended: bool) -> TrialResult {
        TrialResult {
            preset: Preset::Veryfast,
            size: Resolution::new(height * 16 / 9, height),
            frame_rate: FrameRate::FPS_30,
            bitrate_kbps: 2100,
            system_avg_cpu: 0.5,
            own_avg_cpu: 0.2,
            recommended,
        }
    }

    fn outcome() -> BenchmarkOutcome {
        BenchmarkOutcome {
            budget: Budget::for_local_file(CpuLimit::Medium, &BenchmarkConfig::default()),
            results: vec![result(480, false), result(1080, true)],
            recommended: Some(1),
        }
    }

    #[test]
    fn test_canvas_never_below_720p() {
        let budget = outcome().budget;
        let small = RecommendedSettings::from_result(&result(360, false), &budget);
        assert_eq!(small.canvas, Resolution::new(1280, 720));
        assert_eq!(small.output_size.height, 360);
        let large = RecommendedSettings::from_result(&result(1080, false), &budget);
        assert_eq!(large.canvas, Resolution::new(1920, 1080));
    }

    #[test]
    fn test_select_uses_default_key_interval_and_audio_budget() {
        let settings = outcome().select(0).unwrap();
        assert_eq!(settings.video.key_interval_secs, 0);
        assert_eq!(settings.video.bitrate_kbps, 2100);
        assert_eq!(settings.video.preset, Preset::Veryfast);
        assert_eq!(settings.audio_bitrate_kbps, 128);
    }

    #[test]
    fn test_select_out_of_range() {
        let err = outcome().select(5).unwrap_err();
        assert!(matches!(err, Error::NoSuchResult { index: 5, len: 2 }));
    }

    #[test]
    fn test_recommended_settings() {
        let settings = outcome().recommended_settings().unwrap();
        assert_eq!(settings.output_size.height, 1080);

        let empty = BenchmarkOutcome {
            results: Vec::new(),
            recommended: None,
            ..outcome()
        };
        assert!(empty.is_empty());
        assert!(empty.recommended_settings().is_none());
    }
}
