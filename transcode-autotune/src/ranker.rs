//! Picks the single recommended trial result.

use crate::preset::Preset;
use crate::types::{FrameRate, TrialResult};

/// Flag the best 30 Hz result as recommended and return its index.
///
/// Quality tiers are scanned from `min_preset` down to the fastest preset.
/// At each tier the highest resolution among results using that preset or
/// better wins; ties go to the better preset, then to the earlier result.
/// Scanning stops at the first tier with any match. Returns `None` for an
/// empty or 30 Hz-free list, which means no viable settings were found.
pub fn rank(results: &mut [TrialResult], min_preset: Preset) -> Option<usize> {
    for result in results.iter_mut() {
        result.recommended = false;
    }

    let tiers = Preset::ALL.iter().rev().filter(|p| **p <= min_preset);
    let mut best: Option<usize> = None;
    for tier in tiers {
        for (i, result) in results.iter().enumerate() {
            if result.frame_rate != FrameRate::FPS_30 || result.preset < *tier {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    let current = &results[b];
                    (result.size.height, result.preset) > (current.size.height, current.preset)
                }
            };
            if better {
                best = Some(i);
            }
        }
        if best.is_some() {
            break;
        }
    }

    if let Some(i) = best {
        results[i].recommended = true;
    }
    best
}
