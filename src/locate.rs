//! Binary-search keyframe locator.

use crate::property::Keyframe;

/// Find the segment index `i` such that
/// `keyframes[i].frame <= frame <= keyframes[i + 1].frame`.
///
/// Callers short-circuit frames outside `[first.frame, last.frame]` before
/// calling; on unsorted input the result is clamped into `[0, n - 2]` as a
/// defensive fallback rather than left undefined.
pub fn locate(keyframes: &[Keyframe], frame: f64) -> usize {
    let n = keyframes.len();
    debug_assert!(n >= 2, "locate requires at least two keyframes");
    if n < 2 {
        return 0;
    }

    let mut lo = 0usize;
    let mut hi = n - 1;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if (keyframes[mid].frame as f64) <= frame {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo.min(n - 2)
}
