//! CPU usage sampling.
//!
//! A sample is started when a trial leaves its warm-up and read once when the
//! trial ends. Each sample only covers the interval since its own creation:
//! nothing accumulates across trials.
//!
//! # Platform Support
//!
//! | Platform | Sampler | System usage source |
//! |----------|---------|---------------------|
//! | Linux | [`ProcStatSampler`] | `/proc/stat` |
//! | Other Unix | [`RusageSampler`] | not available, mirrors process usage |

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Average CPU usage over a sampling interval, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuUsage {
    /// Share of total machine time consumed by this process.
    pub own: f64,
    /// Share of total machine time that was not idle.
    pub system: f64,
}

/// A running CPU usage measurement.
pub trait UsageSample {
    /// Average usage between the creation of this sample and now.
    fn average_usage(&self) -> CpuUsage;
}

/// Source of CPU usage samples.
pub trait UsageSampler {
    type Sample: UsageSample;

    /// Begin a new measurement interval.
    fn start(&self) -> Self::Sample;
}

/// Process CPU time (user + system) consumed so far.
///
/// Best-effort: returns zero if `getrusage` fails.
#[cfg(unix)]
pub fn process_cpu_time() -> Duration {
    // SAFETY: `getrusage` only writes into the zero-initialised struct we own.
    let usage = unsafe {
        let mut usage: libc::rusage = std::mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut usage) != 0 {
            return Duration::ZERO;
        }
        usage
    };
    timeval_to_duration(usage.ru_utime).saturating_add(timeval_to_duration(usage.ru_stime))
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    let secs = if tv.tv_sec < 0 { 0 } else { tv.tv_sec as u64 };
    let usec = tv.tv_usec.clamp(0, 999_999) as u64;
    Duration::from_secs(secs) + Duration::from_micros(usec)
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    (part / whole).clamp(0.0, 1.0)
}

/// Aggregate jiffy counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemTimes {
    pub idle: u64,
    pub total: u64,
}

impl SystemTimes {
    /// Parse the contents of `/proc/stat`.
    ///
    /// Idle time includes iowait. Guest time is already counted in user
    /// time, so only the first eight columns are summed.
    pub fn parse(stat: &str) -> Option<Self> {
        let line = stat.lines().find(|l| l.starts_with("cpu "))?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(|f| f.parse().ok())
            .collect::<Option<_>>()?;
        if fields.len() < 4 {
            return None;
        }
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        Some(Self {
            idle,
            total: fields.iter().sum(),
        })
    }

    fn since(&self, earlier: &SystemTimes) -> SystemTimes {
        SystemTimes {
            idle: self.idle.saturating_sub(earlier.idle),
            total: self.total.saturating_sub(earlier.total),
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::{ProcStatSample, ProcStatSampler};

#[cfg(target_os = "linux")]
mod linux {
    use std::time::Duration;

    use tracing::warn;

    use super::{process_cpu_time, ratio, CpuUsage, SystemTimes, UsageSample, UsageSampler};
    use crate::error::{Error, Result};

    const PROC_STAT: &str = "/proc/stat";

    fn read_system_times() -> Option<SystemTimes> {
        let stat = std::fs::read_to_string(PROC_STAT).ok()?;
        SystemTimes::parse(&stat)
    }

    /// Samples process time via `getrusage` and system time via `/proc/stat`.
    #[derive(Debug, Clone)]
    pub struct ProcStatSampler {
        ticks_per_sec: f64,
    }

    impl ProcStatSampler {
        /// Fails if `/proc/stat` cannot be read or parsed.
        pub fn new() -> Result<Self> {
            if read_system_times().is_none() {
                return Err(Error::Sampler(format!("cannot read {PROC_STAT}")));
            }
            // SAFETY: sysconf has no memory-safety preconditions.
            let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
            if ticks <= 0 {
                return Err(Error::Sampler("cannot determine clock tick rate".into()));
            }
            Ok(Self {
                ticks_per_sec: ticks as f64,
            })
        }
    }

    impl UsageSampler for ProcStatSampler {
        type Sample = ProcStatSample;

        fn start(&self) -> ProcStatSample {
            ProcStatSample {
                ticks_per_sec: self.ticks_per_sec,
                system: read_system_times().unwrap_or_default(),
                process: process_cpu_time(),
            }
        }
    }

    /// Snapshot taken by [`ProcStatSampler::start`].
    #[derive(Debug, Clone)]
    pub struct ProcStatSample {
        ticks_per_sec: f64,
        system: SystemTimes,
        process: Duration,
    }

    impl UsageSample for ProcStatSample {
        fn average_usage(&self) -> CpuUsage {
            let Some(now) = read_system_times() else {
                warn!("Failed to re-read {PROC_STAT}, reporting zero usage");
                return CpuUsage::default();
            };
            let delta = now.since(&self.system);
            let process = process_cpu_time().saturating_sub(self.process);
            let total_secs = delta.total as f64 / self.ticks_per_sec;
            CpuUsage {
                own: ratio(process.as_secs_f64(), total_secs),
                system: 1.0 - ratio(delta.idle as f64, delta.total as f64),
            }
        }
    }
}

#[cfg(unix)]
pub use portable::{RusageSample, RusageSampler};

#[cfg(unix)]
mod portable {
    use std::time::{Duration, Instant};

    use super::{process_cpu_time, ratio, CpuUsage, UsageSample, UsageSampler};

    /// Samples process time against wall time across all cores.
    ///
    /// There is no portable source of system-wide usage, so the system
    /// figure mirrors the process figure.
    #[derive(Debug, Clone)]
    pub struct RusageSampler {
        cores: f64,
    }

    impl RusageSampler {
        pub fn new() -> Self {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            Self { cores: cores as f64 }
        }
    }

    impl Default for RusageSampler {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UsageSampler for RusageSampler {
        type Sample = RusageSample;

        fn start(&self) -> RusageSample {
            RusageSample {
                cores: self.cores,
                started: Instant::now(),
                process: process_cpu_time(),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct RusageSample {
        cores: f64,
        started: Instant,
        process: Duration,
    }

    impl UsageSample for RusageSample {
        fn average_usage(&self) -> CpuUsage {
            let wall = self.started.elapsed().as_secs_f64() * self.cores;
            let process = process_cpu_time().saturating_sub(self.process);
            let own = ratio(process.as_secs_f64(), wall);
            CpuUsage { own, system: own }
        }
    }
}

/// Best sampler for the current platform.
#[cfg(target_os = "linux")]
pub type PlatformSampler = ProcStatSampler;

#[cfg(all(unix, not(target_os = "linux")))]
pub type PlatformSampler = RusageSampler;

/// Construct the sampler for the current platform.
#[cfg(target_os = "linux")]
pub fn platform_sampler() -> crate::error::Result<PlatformSampler> {
    ProcStatSampler::new()
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn platform_sampler() -> crate::error::Result<PlatformSampler> {
    Ok(RusageSampler::new())
}
