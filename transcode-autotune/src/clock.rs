//! Frame clock and output profile collaborators.

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::types::FrameRate;

/// One tick of the output frame clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTick {
    pub frame_number: u64,
    /// Frames skipped since the previous tick because the consumer fell behind.
    pub dropped: u32,
}

/// Source of frame ticks at a given rate.
pub trait FrameClock {
    /// Wait for the next tick at `rate`. `None` means the clock has stopped.
    fn next_tick(&mut self, rate: FrameRate) -> Option<FrameTick>;
}

/// Holder of the output frame rate the benchmark encodes at.
pub trait OutputProfile {
    fn frame_rate(&self) -> FrameRate;

    /// Switch the output frame rate. Takes effect before this returns.
    fn set_frame_rate(&mut self, rate: FrameRate) -> Result<()>;
}

/// In-memory profile that accepts any frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProfile {
    rate: FrameRate,
}

impl FixedProfile {
    pub fn new(rate: FrameRate) -> Self {
        Self { rate }
    }
}

impl Default for FixedProfile {
    fn default() -> Self {
        Self::new(FrameRate::FPS_30)
    }
}

impl OutputProfile for FixedProfile {
    fn frame_rate(&self) -> FrameRate {
        self.rate
    }

    fn set_frame_rate(&mut self, rate: FrameRate) -> Result<()> {
        self.rate = rate;
        Ok(())
    }
}

/// Real-time clock that sleeps until each frame deadline.
///
/// When the caller falls more than a frame behind, the missed deadlines are
/// reported as dropped instead of being delivered late.
#[derive(Debug, Default)]
pub struct PacedClock {
    rate: Option<FrameRate>,
    next_deadline: Option<Instant>,
    frame_number: u64,
}

impl PacedClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameClock for PacedClock {
    fn next_tick(&mut self, rate: FrameRate) -> Option<FrameTick> {
        let fps = rate.as_f64();
        if fps <= 0.0 {
            return None;
        }
        let interval = Duration::from_secs_f64(1.0 / fps);

        let now = Instant::now();
        if self.rate != Some(rate) {
            self.rate = Some(rate);
            self.next_deadline = Some(now + interval);
        }
        let deadline = self.next_deadline.unwrap_or(now);

        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        let now = Instant::now();
        let late = now.saturating_duration_since(deadline);
        let dropped = (late.as_secs_f64() / interval.as_secs_f64()).floor() as u32;

        self.frame_number += 1 + dropped as u64;
        self.next_deadline = Some(deadline + interval * (dropped + 1));
        Some(FrameTick {
            frame_number: self.frame_number,
            dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_profile() {
        let mut profile = FixedProfile::default();
        assert_eq!(profile.frame_rate(), FrameRate::FPS_30);
        profile.set_frame_rate(FrameRate::FPS_60).unwrap();
        assert_eq!(profile.frame_rate(), FrameRate::FPS_60);
    }

    #[test]
    fn test_paced_clock_advances() {
        let mut clock = PacedClock::new();
        let rate = FrameRate::from_int(500);
        let first = clock.next_tick(rate).unwrap();
        let second = clock.next_tick(rate).unwrap();
        assert!(second.frame_number > first.frame_number);
    }

    #[test]
    fn test_paced_clock_reports_drops() {
        let mut clock = PacedClock::new();
        let rate = FrameRate::from_int(1000);
        clock.next_tick(rate).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let tick = clock.next_tick(rate).unwrap();
        assert!(tick.dropped > 0);
    }

    #[test]
    fn test_paced_clock_rejects_zero_rate() {
        let mut clock = PacedClock::new();
        assert!(clock.next_tick(FrameRate::new(0, 1)).is_none());
    }
}
