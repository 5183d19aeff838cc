//! Property-based tests for the bitrate heuristics.

use proptest::prelude::*;
use transcode_autotune::advisor::{
    ideal_bitrate_kbps, max_bitrates_from_upload, round_bitrate, trial_bitrate, TrialBitrate,
    MIN_VIDEO_BITRATE_KBPS,
};
use transcode_autotune::{rank, FrameRate, Preset, Resolution, TargetKind, TrialResult, STANDARD_SIZES};

fn frame_rate() -> impl Strategy<Value = FrameRate> {
    prop_oneof![Just(FrameRate::FPS_30), Just(FrameRate::FPS_60)]
}

fn size() -> impl Strategy<Value = Resolution> {
    (0..STANDARD_SIZES.len()).prop_map(|i| STANDARD_SIZES[i])
}

fn preset() -> impl Strategy<Value = Preset> {
    prop_oneof![
        Just(Preset::Faster),
        Just(Preset::Veryfast),
        Just(Preset::Superfast),
        Just(Preset::Ultrafast),
    ]
}

fn trial_result() -> impl Strategy<Value = TrialResult> {
    (preset(), size(), frame_rate()).prop_map(|(preset, size, frame_rate)| TrialResult {
        preset,
        size,
        frame_rate,
        bitrate_kbps: 1000,
        system_avg_cpu: 0.5,
        own_avg_cpu: 0.2,
        recommended: false,
    })
}

// =============================================================================
// Rounding
// =============================================================================

proptest! {
    /// Rounded values land on the 50 or 100 Kb/s grid.
    #[test]
    fn rounded_bitrate_is_on_grid(kbps in 1.0f64..100_000.0) {
        let rounded = round_bitrate(kbps);
        if kbps <= 1000.0 {
            prop_assert_eq!(rounded % 50, 0);
            prop_assert!((rounded as f64 - kbps).abs() <= 25.0);
        } else {
            prop_assert_eq!(rounded % 100, 0);
            prop_assert!((rounded as f64 - kbps).abs() <= 50.0);
        }
    }

    /// Rounding never reorders inputs.
    #[test]
    fn rounding_is_monotonic(a in 0.0f64..20_000.0, b in 0.0f64..20_000.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(round_bitrate(lo) <= round_bitrate(hi));
    }

    /// Recommended bitrates are already rounded.
    #[test]
    fn ideal_bitrate_is_rounded(size in size(), fps in frame_rate(), high_action in any::<bool>()) {
        let ideal = ideal_bitrate_kbps(size, fps, high_action);
        prop_assert!(ideal > 0);
        prop_assert_eq!(round_bitrate(ideal as f64), ideal);
    }

    /// Larger outputs never get a lower recommendation.
    #[test]
    fn ideal_bitrate_grows_with_size(i in 0usize..5, fps in frame_rate(), high_action in any::<bool>()) {
        let smaller = ideal_bitrate_kbps(STANDARD_SIZES[i], fps, high_action);
        let larger = ideal_bitrate_kbps(STANDARD_SIZES[i + 1], fps, high_action);
        prop_assert!(smaller < larger);
    }
}

// =============================================================================
// Trial Bitrates
// =============================================================================

proptest! {
    /// A trial never runs above the upload ceiling.
    #[test]
    fn trial_bitrate_respects_ceiling(
        size_index in 0usize..6,
        fps in frame_rate(),
        high_action in any::<bool>(),
        ceiling_steps in 2u32..200,
    ) {
        let max_video_kbps = ceiling_steps * 50;
        let ideal = ideal_bitrate_kbps(STANDARD_SIZES[size_index], fps, high_action);
        match trial_bitrate(ideal, size_index == 0, TargetKind::Stream, max_video_kbps) {
            TrialBitrate::Use(kbps) => {
                prop_assert!(kbps <= max_video_kbps);
                prop_assert!(kbps > 0);
            }
            TrialBitrate::Skip => {
                prop_assert!(size_index > 0);
                prop_assert!(ideal as f64 * 0.75 > max_video_kbps as f64);
            }
        }
    }

    /// The smallest size is the last resort and is never skipped.
    #[test]
    fn smallest_size_never_skipped(ideal in 50u32..10_000, max_video_kbps in 100u32..10_000) {
        let decision = trial_bitrate(ideal, true, TargetKind::Stream, max_video_kbps);
        let expected = round_bitrate(ideal as f64 * 1.45).min(max_video_kbps);
        prop_assert_eq!(decision, TrialBitrate::Use(expected));
    }

    /// Upload splits never drop below the minimum video bitrate.
    #[test]
    fn upload_split_has_floor(upload in 0.0f64..100_000.0, interactive in any::<bool>()) {
        let split = max_bitrates_from_upload(upload, interactive);
        prop_assert!(split.video_kbps >= MIN_VIDEO_BITRATE_KBPS);
        prop_assert!([32, 64, 96, 128].contains(&split.audio_kbps));
    }
}

// =============================================================================
// Ranking
// =============================================================================

proptest! {
    /// At most one result is flagged, and only a 30 Hz one.
    #[test]
    fn rank_flags_single_30hz_result(mut results in prop::collection::vec(trial_result(), 0..24)) {
        let picked = rank(&mut results, Preset::Veryfast);
        let flagged: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.recommended)
            .map(|(i, _)| i)
            .collect();
        match picked {
            Some(i) => {
                prop_assert_eq!(flagged, vec![i]);
                prop_assert_eq!(results[i].frame_rate, FrameRate::FPS_30);
            }
            None => {
                prop_assert!(flagged.is_empty());
                prop_assert!(results.iter().all(|r| r.frame_rate != FrameRate::FPS_30));
            }
        }
    }

    /// Ranking the same list twice gives the same answer.
    #[test]
    fn rank_is_deterministic(results in prop::collection::vec(trial_result(), 0..24)) {
        let mut first = results.clone();
        let mut second = results;
        prop_assert_eq!(rank(&mut first, Preset::Veryfast), rank(&mut second, Preset::Veryfast));
        prop_assert_eq!(first, second);
    }
}
