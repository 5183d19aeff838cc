//! Encoder capability benchmark and output settings recommender.
//!
//! This crate measures how much CPU a live video encoder needs at a range of
//! output sizes, frame rates and speed presets, then recommends the best
//! combination the machine can sustain within a user-chosen CPU budget.
//!
//! # Overview
//!
//! A run is a sequence of short trials. Each trial activates one encoder,
//! feeds it frames from the output frame clock for a fixed interval, and
//! samples CPU usage after a warm-up. Trials that stay within the budget are
//! kept as [`TrialResult`]s; the search then moves to a larger size, or to a
//! faster preset when the budget was exceeded. After the 30 Hz grid is
//! exhausted the same search runs at 60 Hz. Finally a single 30 Hz result is
//! flagged as recommended.
//!
//! Bitrates for each trial come from the [`advisor`] tables and are capped by
//! the available upload bandwidth unless the target is a local file.
//!
//! # Example
//!
//! ```no_run
//! use transcode_autotune::{
//!     drive, platform_sampler, BenchmarkConfig, BenchmarkEngine, Budget, CpuLimit,
//!     FixedProfile, PacedClock, SoftwareEncoderFactory, UploadSettings,
//! };
//!
//! # fn main() -> transcode_autotune::Result<()> {
//! let config = BenchmarkConfig::default();
//! let upload = UploadSettings {
//!     upload_kbps: 3000.0,
//!     interactive: true,
//!     high_action: false,
//!     has_transcoder: false,
//! };
//! let budget = Budget::from_upload(&upload, CpuLimit::Medium, &config);
//!
//! let mut engine = BenchmarkEngine::new(
//!     config,
//!     SoftwareEncoderFactory,
//!     platform_sampler()?,
//!     FixedProfile::default(),
//! )?;
//! engine.start(budget)?;
//! drive(&mut engine, &mut PacedClock::new(), |_| {})?;
//!
//! for result in engine.results() {
//!     println!("{}", result.describe(engine.config().reserved_cpu));
//! }
//! # Ok(())
//! # }
//! ```

pub mod advisor;
mod budget;
mod clock;
mod config;
mod encoder;
mod engine;
mod error;
mod harness;
mod preset;
mod ranker;
mod settings;
mod types;
mod usage;

pub use budget::{Budget, CpuLimit, UploadSettings};
pub use clock::{FixedProfile, FrameClock, FrameTick, OutputProfile, PacedClock};
pub use config::BenchmarkConfig;
pub use encoder::{
    EncoderConfig, EncoderFactory, EncoderOptions, ScaleFilter, ScalingMode, SoftwareEncoder,
    SoftwareEncoderFactory, TrialEncoder,
};
pub use engine::{drive, BenchmarkEngine, BenchmarkState, Progress, SearchCursor};
pub use error::{ActivationError, Error, Result};
pub use harness::{TrialHarness, TRIAL_KEY_INTERVAL_SECS};
pub use preset::Preset;
pub use ranker::rank;
pub use settings::{BenchmarkOutcome, RecommendedSettings};
pub use types::{
    ContentProfile, FrameRate, Resolution, TargetKind, TrialResult, TrialSpec, STANDARD_SIZES,
};
pub use usage::{CpuUsage, UsageSample, UsageSampler};
#[cfg(unix)]
pub use usage::{platform_sampler, PlatformSampler, RusageSampler};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
