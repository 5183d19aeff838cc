//! Benchmark search state machine.
//!
//! The engine walks a (preset, size) grid once per frame rate. It assumes
//! that a larger output always costs more CPU and that a faster preset
//! always costs less. For a given preset it keeps growing the output size
//! while trials fit the budget; the moment one does not, it retries the same
//! size with the next faster preset. Nothing verifies this assumption at
//! runtime: an encoder whose cost is not monotonic in size or preset can
//! cause viable combinations to be skipped.
//!
//! The engine has no thread of its own. It advances only when the frame
//! clock calls [`BenchmarkEngine::on_frame_tick`], and trial duration is
//! measured in delivered ticks rather than wall time.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::advisor::{ideal_bitrate_kbps, trial_bitrate, TrialBitrate};
use crate::budget::Budget;
use crate::clock::{FrameClock, FrameTick, OutputProfile};
use crate::config::BenchmarkConfig;
use crate::encoder::EncoderFactory;
use crate::error::{Error, Result};
use crate::harness::{elapsed_seconds, TrialHarness};
use crate::ranker::rank;
use crate::settings::BenchmarkOutcome;
use crate::types::{FrameRate, TrialResult, TrialSpec};
use crate::usage::{CpuUsage, UsageSample, UsageSampler};

/// Lifecycle of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchmarkState {
    Idle,
    /// A trial encoder is live and warming up; CPU is not sampled yet.
    Preparing,
    /// A trial encoder is live and CPU usage is being sampled.
    Sampling,
    /// The previous trial is being judged and the next one chosen. Only
    /// held while the engine is inside a call.
    Evaluating,
    Finished,
}

impl BenchmarkState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Preparing | Self::Sampling | Self::Evaluating)
    }
}

/// Position of the search within the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCursor {
    /// `None` until the first trial has been chosen.
    pub preset_index: Option<usize>,
    pub size_index: usize,
    pub frame_rate: FrameRate,
    pub tests_completed: u32,
    pub tests_total: u32,
}

/// Snapshot for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub tests_done: u32,
    pub tests_total: u32,
    /// Completion of the current trial, 0 - 100.
    pub partial_percent: u32,
}

impl Progress {
    /// Overall completion in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.tests_total == 0 {
            return 1.0;
        }
        let done = self.tests_done as f64 * 100.0 + self.partial_percent as f64;
        (done / (self.tests_total as f64 * 100.0)).clamp(0.0, 1.0)
    }
}

/// Drives encoder trials and collects the ones that fit the CPU budget.
pub struct BenchmarkEngine<F: EncoderFactory, S: UsageSampler, P: OutputProfile> {
    config: BenchmarkConfig,
    harness: TrialHarness<F>,
    sampler: S,
    profile: P,
    state: BenchmarkState,
    budget: Option<Budget>,
    cursor: SearchCursor,
    frame_rate_index: usize,
    sample: Option<S::Sample>,
    frame_in_trial: u64,
    results: Vec<TrialResult>,
    recommended: Option<usize>,
}

impl<F: EncoderFactory, S: UsageSampler, P: OutputProfile> BenchmarkEngine<F, S, P> {
    pub fn new(config: BenchmarkConfig, factory: F, sampler: S, profile: P) -> Result<Self> {
        config.validate()?;
        let cursor = SearchCursor {
            preset_index: None,
            size_index: 0,
            frame_rate: config.frame_rates[0],
            tests_completed: 0,
            tests_total: config.total_tests(),
        };
        Ok(Self {
            harness: TrialHarness::new(factory).with_key_interval(config.key_interval_secs),
            config,
            sampler,
            profile,
            state: BenchmarkState::Idle,
            budget: None,
            cursor,
            frame_rate_index: 0,
            sample: None,
            frame_in_trial: 0,
            results: Vec::new(),
            recommended: None,
        })
    }

    /// Begin a run under `budget`.
    ///
    /// Fails with [`Error::NotReady`] if a run is already in progress or
    /// the output profile cannot be switched to the first frame rate.
    pub fn start(&mut self, budget: Budget) -> Result<()> {
        if self.state.is_running() {
            return Err(Error::NotReady("a benchmark is already running".into()));
        }

        let first_rate = self.config.frame_rates[0];
        if self.profile.frame_rate() != first_rate {
            self.profile
                .set_frame_rate(first_rate)
                .map_err(|e| Error::NotReady(e.to_string()))?;
        }

        self.budget = Some(budget);
        self.results.clear();
        self.recommended = None;
        self.sample = None;
        self.frame_in_trial = 0;
        self.frame_rate_index = 0;
        self.cursor = SearchCursor {
            preset_index: None,
            size_index: 0,
            frame_rate: first_rate,
            tests_completed: 0,
            tests_total: self.config.total_tests(),
        };

        info!(
            max_own_cpu = budget.max_own_cpu,
            max_system_cpu = budget.max_system_cpu,
            max_video_kbps = budget.max_video_kbps,
            high_action = budget.content.high_action,
            target = ?budget.target,
            "System benchmark begin"
        );
        self.state = BenchmarkState::Preparing;
        self.do_next_trial();
        Ok(())
    }

    /// Cancel the run without judging the trial in flight.
    pub fn stop(&mut self) -> Result<()> {
        if !self.state.is_running() {
            return Err(Error::NotRunning);
        }
        info!(
            tests_completed = self.cursor.tests_completed,
            "System benchmark cancelled"
        );
        self.finish();
        Ok(())
    }

    /// Advance by one output frame.
    pub fn on_frame_tick(&mut self, tick: FrameTick) {
        if !self.state.is_running() {
            return;
        }
        if tick.dropped > 0 {
            trace!(
                frame_number = tick.frame_number,
                dropped = tick.dropped,
                "Frame clock dropped frames"
            );
        }

        self.harness.feed_frame(self.frame_in_trial);
        self.frame_in_trial += 1;

        let mut elapsed = elapsed_seconds(self.frame_in_trial, self.cursor.frame_rate);
        if elapsed >= self.config.trial_duration_secs {
            self.do_next_trial();
            if !self.state.is_running() {
                return;
            }
            elapsed = 0.0;
        }

        if self.sample.is_none() && elapsed >= self.config.warmup_secs {
            self.sample = Some(self.sampler.start());
            self.state = BenchmarkState::Sampling;
        }
    }

    /// Progress for display. Has no effect on the search.
    pub fn on_ui_tick(&self) -> Progress {
        let elapsed = elapsed_seconds(self.frame_in_trial, self.cursor.frame_rate);
        let partial = if self.state.is_running() {
            (elapsed / self.config.trial_duration_secs * 100.0)
                .round()
                .clamp(0.0, 100.0) as u32
        } else {
            0
        };
        Progress {
            tests_done: self.cursor.tests_completed.min(self.cursor.tests_total),
            tests_total: self.cursor.tests_total,
            partial_percent: partial,
        }
    }

    /// Judge the trial that just ended, then start the next one.
    fn do_next_trial(&mut self) {
        self.state = BenchmarkState::Evaluating;
        let Some(budget) = self.budget else {
            self.finish();
            return;
        };

        let exceeded = self.evaluate_finished_trial(&budget);

        loop {
            let presets = self.config.presets.len();
            match self.cursor.preset_index {
                None => {
                    self.cursor.preset_index = Some(0);
                    self.cursor.size_index = 0;
                }
                Some(p) if exceeded => {
                    self.cursor.preset_index = Some(p + 1);
                    self.cursor.tests_completed += 1;
                }
                Some(_) => {
                    self.cursor.size_index += 1;
                    self.cursor.tests_completed += presets as u32;
                }
            }

            let preset_index = self.cursor.preset_index.unwrap_or(0);
            if preset_index >= presets || self.cursor.size_index >= self.config.sizes.len() {
                if !self.advance_frame_rate() {
                    self.finish();
                    return;
                }
            }

            let preset_index = self.cursor.preset_index.unwrap_or(0);
            let size_index = self.cursor.size_index;
            let preset = self.config.presets[preset_index];
            let size = self.config.sizes[size_index];
            let frame_rate = self.cursor.frame_rate;

            let ideal = ideal_bitrate_kbps(size, frame_rate, budget.content.high_action);
            let bitrate_kbps =
                match trial_bitrate(ideal, size_index == 0, budget.target, budget.max_video_kbps) {
                    TrialBitrate::Use(kbps) => kbps,
                    TrialBitrate::Skip => {
                        warn!(
                            height = size.height,
                            ideal_kbps = ideal,
                            max_video_kbps = budget.max_video_kbps,
                            "Upload speed is too low for this size, skipping"
                        );
                        continue;
                    }
                };

            let spec = TrialSpec {
                preset,
                size,
                frame_rate,
                bitrate_kbps,
            };
            match self.harness.begin_trial(spec) {
                Ok(()) => break,
                Err(e) => {
                    warn!(
                        preset = %preset,
                        size = %size,
                        fps = %frame_rate,
                        error = %e,
                        "Trial encoder failed to activate, skipping"
                    );
                    continue;
                }
            }
        }

        debug!(
            tests_completed = self.cursor.tests_completed,
            tests_total = self.cursor.tests_total,
            "Trial started"
        );
        self.frame_in_trial = 0;
        self.state = BenchmarkState::Preparing;
    }

    /// Tear down the live trial and record it if it fit the budget.
    /// Returns whether the budget was exceeded; `false` if there was no trial.
    fn evaluate_finished_trial(&mut self, budget: &Budget) -> bool {
        let usage = match self.sample.take() {
            Some(sample) => sample.average_usage(),
            None => CpuUsage::default(),
        };

        let Some(spec) = self.harness.active_spec().copied() else {
            return false;
        };
        let bitrate_kbps = self.harness.end_trial().unwrap_or(spec.bitrate_kbps);

        let exceeded = budget.is_exceeded_by(usage.own, usage.system);
        if !exceeded {
            self.results.push(TrialResult {
                preset: spec.preset,
                size: spec.size,
                frame_rate: spec.frame_rate,
                bitrate_kbps,
                system_avg_cpu: usage.system,
                own_avg_cpu: usage.own,
                recommended: false,
            });
        }
        info!(
            preset = %spec.preset,
            size = %spec.size,
            fps = %spec.frame_rate,
            bitrate_kbps,
            own_cpu_percent = (usage.own * 100.0).round() as i64,
            system_cpu_percent = (usage.system * 100.0).round() as i64,
            within_limits = !exceeded,
            "Trial complete"
        );
        exceeded
    }

    /// Move to the next frame rate with a fresh grid. Returns `false` when
    /// every frame rate has been tried or the profile refused the switch.
    fn advance_frame_rate(&mut self) -> bool {
        let next = self.frame_rate_index + 1;
        let Some(&rate) = self.config.frame_rates.get(next) else {
            return false;
        };
        if let Err(e) = self.profile.set_frame_rate(rate) {
            warn!(fps = %rate, error = %e, "Cannot switch output frame rate, ending benchmark");
            return false;
        }
        info!(fps = %rate, "Frame rate grid exhausted, switching");
        self.frame_rate_index = next;
        self.cursor.frame_rate = rate;
        self.cursor.preset_index = Some(0);
        self.cursor.size_index = 0;
        true
    }

    fn finish(&mut self) {
        self.harness.end_trial();
        self.sample = None;
        self.recommended = rank(&mut self.results, self.config.recommend_min_preset);
        self.state = BenchmarkState::Finished;
        info!(
            accepted = self.results.len(),
            recommended = ?self.recommended,
            "System benchmark end"
        );
    }

    pub fn state(&self) -> BenchmarkState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn cursor(&self) -> &SearchCursor {
        &self.cursor
    }

    /// Frame rate the current trial runs at.
    pub fn frame_rate(&self) -> FrameRate {
        self.cursor.frame_rate
    }

    pub fn current_trial(&self) -> Option<&TrialSpec> {
        self.harness.active_spec()
    }

    /// Accepted trials so far, in completion order.
    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    pub fn recommended_index(&self) -> Option<usize> {
        self.recommended
    }

    pub fn budget(&self) -> Option<&Budget> {
        self.budget.as_ref()
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn factory(&self) -> &F {
        self.harness.factory()
    }

    /// Results of a finished run; `None` while running or before any run.
    pub fn outcome(&self) -> Option<BenchmarkOutcome> {
        if self.state != BenchmarkState::Finished {
            return None;
        }
        Some(BenchmarkOutcome {
            budget: self.budget?,
            results: self.results.clone(),
            recommended: self.recommended,
        })
    }

    /// Consume the engine, cancelling a run still in progress.
    pub fn into_outcome(mut self) -> Option<BenchmarkOutcome> {
        if self.state.is_running() {
            self.finish();
        }
        self.outcome()
    }
}

/// Feed ticks from `clock` into `engine` until the run ends.
///
/// `on_progress` is called after every tick. If the clock stops first the
/// run is cancelled.
pub fn drive<F, S, P, C>(
    engine: &mut BenchmarkEngine<F, S, P>,
    clock: &mut C,
    mut on_progress: impl FnMut(Progress),
) -> Result<()>
where
    F: EncoderFactory,
    S: UsageSampler,
    P: OutputProfile,
    C: FrameClock + ?Sized,
{
    while engine.is_running() {
        match clock.next_tick(engine.frame_rate()) {
            Some(tick) => {
                engine.on_frame_tick(tick);
                on_progress(engine.on_ui_tick());
            }
            None => {
                warn!("Frame clock stopped before the benchmark finished");
                return engine.stop();
            }
        }
    }
    Ok(())
}
