//! Lifecycle of the single live trial encoder.

use tracing::{debug, warn};

use crate::encoder::{
    EncoderConfig, EncoderFactory, EncoderOptions, ScaleFilter, ScalingMode, TrialEncoder,
};
use crate::error::ActivationError;
use crate::types::{FrameRate, TrialSpec};

/// Keyframe interval used for trial encoders so that keyframes are part of
/// the measured workload.
pub const TRIAL_KEY_INTERVAL_SECS: u32 = 2;

struct ActiveTrial<E> {
    spec: TrialSpec,
    encoder: E,
}

/// Owns at most one activated trial encoder.
pub struct TrialHarness<F: EncoderFactory> {
    factory: F,
    key_interval_secs: u32,
    active: Option<ActiveTrial<F::Encoder>>,
}

impl<F: EncoderFactory> TrialHarness<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            key_interval_secs: TRIAL_KEY_INTERVAL_SECS,
            active: None,
        }
    }

    pub fn with_key_interval(mut self, secs: u32) -> Self {
        self.key_interval_secs = secs;
        self
    }

    /// Create and activate an encoder for `spec`.
    ///
    /// Any trial still running is ended first. On failure no trial is active.
    pub fn begin_trial(&mut self, spec: TrialSpec) -> Result<(), ActivationError> {
        self.end_trial();

        let config = EncoderConfig {
            size: spec.size,
            scaling: ScalingMode::SnapToInnerScale,
            filter: ScaleFilter::Bilinear,
            frame_rate: spec.frame_rate,
            options: EncoderOptions {
                bitrate_kbps: spec.bitrate_kbps,
                preset: spec.preset,
                key_interval_secs: self.key_interval_secs,
            },
        };
        let mut encoder = self.factory.create(&config);
        if let Err(e) = encoder.activate() {
            encoder.deactivate();
            return Err(e);
        }
        debug!(
            preset = %spec.preset,
            size = %spec.size,
            fps = %spec.frame_rate,
            bitrate_kbps = spec.bitrate_kbps,
            "Trial encoder activated"
        );
        self.active = Some(ActiveTrial { spec, encoder });
        Ok(())
    }

    /// Forward one frame tick to the active encoder, if any.
    pub fn feed_frame(&mut self, frame_index: u64) {
        let Some(trial) = self.active.as_mut() else {
            return;
        };
        if let Err(e) = trial.encoder.encode_frame(frame_index) {
            warn!(frame_index, error = %e, "Trial encoder rejected frame");
        }
    }

    /// Stop and drop the active encoder, returning its configured bitrate.
    pub fn end_trial(&mut self) -> Option<u32> {
        let mut trial = self.active.take()?;
        let bitrate = trial.encoder.bitrate_kbps();
        trial.encoder.deactivate();
        Some(bitrate)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_spec(&self) -> Option<&TrialSpec> {
        self.active.as_ref().map(|t| &t.spec)
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

/// Seconds of output represented by `frame_index` frames.
pub fn elapsed_seconds(frame_index: u64, frame_rate: FrameRate) -> f64 {
    let fps = frame_rate.as_f64();
    if fps <= 0.0 {
        return 0.0;
    }
    frame_index as f64 / fps
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::preset::Preset;
    use crate::types::Resolution;

    #[derive(Default)]
    struct Log {
        live: i32,
        frames: Vec<u64>,
        key_intervals: Vec<u32>,
    }

    struct FakeEncoder {
        log: Rc<RefCell<Log>>,
        bitrate: u32,
        fail: bool,
        live: bool,
    }

    impl TrialEncoder for FakeEncoder {
        fn activate(&mut self) -> Result<(), ActivationError> {
            if self.fail {
                return Err(ActivationError::Init { message: "boom".into() });
            }
            self.live = true;
            self.log.borrow_mut().live += 1;
            Ok(())
        }

        fn encode_frame(&mut self, frame_index: u64) -> Result<(), ActivationError> {
            self.log.borrow_mut().frames.push(frame_index);
            Ok(())
        }

        fn deactivate(&mut self) {
            if self.live {
                self.live = false;
                self.log.borrow_mut().live -= 1;
            }
        }

        fn bitrate_kbps(&self) -> u32 {
            self.bitrate
        }
    }

    struct FakeFactory {
        log: Rc<RefCell<Log>>,
        fail_width: u32,
    }

    impl EncoderFactory for FakeFactory {
        type Encoder = FakeEncoder;

        fn create(&self, config: &EncoderConfig) -> FakeEncoder {
            self.log.borrow_mut().key_intervals.push(config.options.key_interval_secs);
            FakeEncoder {
                log: self.log.clone(),
                bitrate: config.options.bitrate_kbps,
                fail: config.size.width == self.fail_width,
                live: false,
            }
        }
    }

    fn spec(width: u32, bitrate_kbps: u32) -> TrialSpec {
        TrialSpec {
            preset: Preset::Veryfast,
            size: Resolution::new(width, 360),
            frame_rate: FrameRate::FPS_30,
            bitrate_kbps,
        }
    }

    fn harness() -> (TrialHarness<FakeFactory>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let factory = FakeFactory {
            log: log.clone(),
            fail_width: 999,
        };
        (TrialHarness::new(factory), log)
    }

    #[test]
    fn test_feed_without_trial_is_noop() {
        let (mut harness, log) = harness();
        harness.feed_frame(3);
        assert!(log.borrow().frames.is_empty());
        assert_eq!(harness.end_trial(), None);
    }

    #[test]
    fn test_begin_feed_end() {
        let (mut harness, log) = harness();
        harness.begin_trial(spec(640, 800)).unwrap();
        assert!(harness.is_active());
        assert_eq!(harness.active_spec().unwrap().bitrate_kbps, 800);
        harness.feed_frame(0);
        harness.feed_frame(1);
        assert_eq!(log.borrow().frames, vec![0, 1]);
        assert_eq!(log.borrow().key_intervals, vec![TRIAL_KEY_INTERVAL_SECS]);
        assert_eq!(harness.end_trial(), Some(800));
        assert!(!harness.is_active());
        assert_eq!(log.borrow().live, 0);
    }

    #[test]
    fn test_begin_replaces_previous_trial() {
        let (mut harness, log) = harness();
        harness.begin_trial(spec(640, 800)).unwrap();
        harness.begin_trial(spec(854, 1000)).unwrap();
        assert_eq!(log.borrow().live, 1);
        assert_eq!(harness.end_trial(), Some(1000));
    }

    #[test]
    fn test_activation_failure_leaves_no_trial() {
        let (mut harness, log) = harness();
        harness.begin_trial(spec(640, 800)).unwrap();
        let err = harness.begin_trial(spec(999, 800)).unwrap_err();
        assert!(matches!(err, ActivationError::Init { .. }));
        assert!(!harness.is_active());
        assert_eq!(log.borrow().live, 0);
    }

    #[test]
    fn test_custom_key_interval() {
        let (harness, log) = harness();
        let mut harness = harness.with_key_interval(5);
        harness.begin_trial(spec(640, 800)).unwrap();
        assert_eq!(log.borrow().key_intervals, vec![5]);
    }

    #[test]
    fn test_elapsed_seconds() {
        assert_eq!(elapsed_seconds(30, FrameRate::FPS_30), 1.0);
        assert_eq!(elapsed_seconds(90, FrameRate::FPS_60), 1.5);
        assert_eq!(elapsed_seconds(10, FrameRate::new(0, 1)), 0.0);
    }
}
