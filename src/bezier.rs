//! Cubic-bezier timing: handle normalization, curve inversion and the
//! bounded normalization cache.

use crate::property::BezierHandle;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Capacity of the normalization cache.
pub const BEZIER_CACHE_CAPACITY: usize = 500;

/// Default normalized handle positions used when a handle is disabled or the
/// segment geometry degenerates (zero duration / zero value delta).
const DEFAULT_X1: f64 = 0.33;
const DEFAULT_Y1: f64 = 0.33;
const DEFAULT_X2: f64 = 0.67;
const DEFAULT_Y2: f64 = 0.67;

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_EPSILON: f64 = 1e-6;

/// A timing curve in the unit square: control points `(x1, y1)` / `(x2, y2)`
/// between the implicit endpoints `(0, 0)` and `(1, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl UnitBezier {
    #[inline]
    pub fn linear() -> Self {
        Self {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
        }
    }

    /// Bernstein-basis x component at parameter `t`.
    #[inline]
    fn sample_x(&self, t: f64) -> f64 {
        cubic(0.0, self.x1, self.x2, 1.0, t)
    }

    /// Bernstein-basis y component at parameter `t`.
    #[inline]
    fn sample_y(&self, t: f64) -> f64 {
        cubic(0.0, self.y1, self.y2, 1.0, t)
    }

    /// dx/dt at parameter `t`.
    #[inline]
    fn sample_dx(&self, t: f64) -> f64 {
        cubic_derivative(0.0, self.x1, self.x2, 1.0, t)
    }

    /// Invert `B_x(t') = x` via Newton-Raphson and return the eased `B_y(t')`.
    ///
    /// Initial guess `t' = x`; at most 8 iterations; converges at 1e-6;
    /// `t'` is clamped into `[0, 1]` each step. When the local derivative
    /// magnitude drops below epsilon the current best estimate is accepted
    /// to avoid division blow-up. Non-convergence is bounded, unreported
    /// error by design of the caller contract.
    pub fn solve(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        let mut t = x;
        for _ in 0..NEWTON_ITERATIONS {
            let err = self.sample_x(t) - x;
            if err.abs() < NEWTON_EPSILON {
                break;
            }
            let d = self.sample_dx(t);
            if d.abs() < NEWTON_EPSILON {
                break;
            }
            t = (t - err / d).clamp(0.0, 1.0);
        }
        self.sample_y(t)
    }
}

#[inline]
fn cubic(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

#[inline]
fn cubic_derivative(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    3.0 * u * u * (p1 - p0) + 6.0 * u * t * (p2 - p1) + 3.0 * t * t * (p3 - p2)
}

/// Normalize absolute handle offsets into unit-square control points.
///
/// `out_handle` belongs to the segment's left keyframe, `in_handle` to the
/// right one (its offsets point backwards into the segment). Disabled
/// handles and degenerate segments use the canonical defaults.
pub fn normalize_handles(
    out_handle: &BezierHandle,
    in_handle: &BezierHandle,
    duration: f64,
    value_delta: f64,
) -> UnitBezier {
    let degenerate_x = duration <= 0.0;
    let degenerate_y = value_delta.abs() < f64::EPSILON;

    let (x1, y1) = if out_handle.enabled && !degenerate_x {
        let x = (out_handle.frame.abs() / duration).clamp(0.0, 1.0);
        let y = if degenerate_y {
            DEFAULT_Y1
        } else {
            out_handle.value / value_delta
        };
        (x, y)
    } else {
        (DEFAULT_X1, DEFAULT_Y1)
    };

    let (x2, y2) = if in_handle.enabled && !degenerate_x {
        let x = (1.0 - (in_handle.frame.abs() / duration)).clamp(0.0, 1.0);
        let y = if degenerate_y {
            DEFAULT_Y2
        } else {
            1.0 + in_handle.value / value_delta
        };
        (x, y)
    } else {
        (DEFAULT_X2, DEFAULT_Y2)
    };

    UnitBezier { x1, y1, x2, y2 }
}

/// Cache key: the 6-tuple of handle and segment parameters rounded to four
/// decimals, stored fixed-point so it hashes exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurveKey([i64; 6]);

impl CurveKey {
    pub fn new(
        out_handle: &BezierHandle,
        in_handle: &BezierHandle,
        duration: f64,
        value_delta: f64,
    ) -> Self {
        #[inline]
        fn round4(v: f64) -> i64 {
            (v * 10_000.0).round() as i64
        }
        // Disabled handles normalize identically regardless of raw offsets.
        let handle = |h: &BezierHandle| -> (i64, i64) {
            if h.enabled {
                (round4(h.frame), round4(h.value))
            } else {
                (i64::MIN, i64::MIN)
            }
        };
        let (of, ov) = handle(out_handle);
        let (inf, inv) = handle(in_handle);
        Self([of, ov, inf, inv, round4(duration), round4(value_delta)])
    }
}

/// Bounded LRU cache of normalized timing curves. A hit promotes the entry
/// to most-recently-used; inserting at capacity evicts the oldest entry.
pub struct CurveCache {
    entries: LruCache<CurveKey, UnitBezier>,
    hits: u64,
    misses: u64,
}

impl CurveCache {
    pub fn new() -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(BEZIER_CACHE_CAPACITY).unwrap()),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up or compute the normalized curve for this segment.
    pub fn normalized(
        &mut self,
        out_handle: &BezierHandle,
        in_handle: &BezierHandle,
        duration: f64,
        value_delta: f64,
    ) -> UnitBezier {
        let key = CurveKey::new(out_handle, in_handle, duration, value_delta);
        if let Some(curve) = self.entries.get(&key) {
            self.hits += 1;
            return *curve;
        }
        self.misses += 1;
        let curve = normalize_handles(out_handle, in_handle, duration, value_delta);
        self.entries.put(key, curve);
        curve
    }

    /// Eased parameter for target `x = t`, through the cache.
    #[inline]
    pub fn ease(
        &mut self,
        t: f64,
        out_handle: &BezierHandle,
        in_handle: &BezierHandle,
        duration: f64,
        value_delta: f64,
    ) -> f64 {
        self.normalized(out_handle, in_handle, duration, value_delta)
            .solve(t)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl Default for CurveCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Uncached easing, used by re-sampling paths that must not touch shared
/// state (expression velocity/loop sampling) and by cache-correctness tests.
pub fn bezier_ease_uncached(
    t: f64,
    out_handle: &BezierHandle,
    in_handle: &BezierHandle,
    duration: f64,
    value_delta: f64,
) -> f64 {
    normalize_handles(out_handle, in_handle, duration, value_delta).solve(t)
}
