//! x264-style encoder speed/quality presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Encoding speed/quality preset.
///
/// Variants are declared in ascending quality order, so `a > b` means `a`
/// is slower and produces better quality at the same bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Fastest encoding, lowest quality.
    Ultrafast,
    Superfast,
    #[default]
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    /// Slowest encoding, highest quality.
    Veryslow,
}

impl Preset {
    /// All presets from fastest to slowest.
    pub const ALL: [Preset; 9] = [
        Preset::Ultrafast,
        Preset::Superfast,
        Preset::Veryfast,
        Preset::Faster,
        Preset::Fast,
        Preset::Medium,
        Preset::Slow,
        Preset::Slower,
        Preset::Veryslow,
    ];

    /// Name as understood by x264.
    pub fn x264_name(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
        }
    }

    /// User-facing quality label.
    pub fn quality_label(&self) -> &'static str {
        match self {
            Self::Ultrafast => "Very low quality",
            Self::Superfast => "Low quality",
            Self::Veryfast => "Good quality",
            Self::Faster => "Great quality",
            Self::Fast => "High quality",
            Self::Medium => "Very high quality",
            Self::Slow => "Super high quality",
            Self::Slower => "Extreme quality",
            Self::Veryslow => "Best quality",
        }
    }

    /// Approximate encode cost relative to `Faster`.
    pub fn relative_cost(&self) -> f64 {
        match self {
            Self::Ultrafast => 0.43,
            Self::Superfast => 0.50,
            Self::Veryfast => 0.64,
            Self::Faster => 1.0,
            Self::Fast => 1.38,
            Self::Medium => 1.58,
            Self::Slow => 2.29,
            Self::Slower => 5.83,
            Self::Veryslow => 8.78,
        }
    }

    /// Motion search radius in pixels used by the software trial encoder.
    pub fn search_radius(&self) -> u32 {
        match self {
            Self::Ultrafast => 1,
            Self::Superfast => 2,
            Self::Veryfast => 3,
            Self::Faster => 4,
            Self::Fast => 5,
            Self::Medium => 6,
            Self::Slow => 8,
            Self::Slower => 12,
            Self::Veryslow => 16,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.x264_name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.x264_name() == name)
            .ok_or_else(|| format!("unknown preset: {name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_ordering() {
        assert!(Preset::Ultrafast < Preset::Superfast);
        assert!(Preset::Veryfast < Preset::Faster);
        assert!(Preset::Slower < Preset::Veryslow);
        for w in Preset::ALL.windows(2) {
            assert!(w[0] < w[1]);
            assert!(w[0].relative_cost() < w[1].relative_cost());
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("veryfast".parse::<Preset>().unwrap(), Preset::Veryfast);
        assert_eq!(" Faster ".parse::<Preset>().unwrap(), Preset::Faster);
        assert!("placebo".parse::<Preset>().is_err());
    }
}
