//! CLI subcommand implementations.

pub mod advise;
pub mod autotune;
pub mod presets;

pub use advise::CmdAdvise;
pub use autotune::CmdAutotune;
pub use presets::CmdPresets;

use clap::ValueEnum;
use transcode_autotune::CpuLimit;

/// CPU budget choices exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CpuArg {
    /// About 20% of the CPU
    #[default]
    Low,
    /// About 40% of the CPU
    Medium,
    /// About 80% of the CPU
    High,
}

impl From<CpuArg> for CpuLimit {
    fn from(arg: CpuArg) -> Self {
        match arg {
            CpuArg::Low => CpuLimit::Low,
            CpuArg::Medium => CpuLimit::Medium,
            CpuArg::High => CpuLimit::High,
        }
    }
}

/// Frame rates the advisor knows how to reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FpsArg {
    #[default]
    #[value(name = "30")]
    Thirty,
    #[value(name = "60")]
    Sixty,
}

impl FpsArg {
    pub fn frame_rate(&self) -> transcode_autotune::FrameRate {
        match self {
            Self::Thirty => transcode_autotune::FrameRate::FPS_30,
            Self::Sixty => transcode_autotune::FrameRate::FPS_60,
        }
    }
}
