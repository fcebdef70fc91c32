//! Keyframe interpolation: the per-frame sampling pipeline.
//!
//! Evaluation is a pure function of `(property, frame)` plus whichever
//! caches the caller supplies. The cacheless entry points exist for
//! re-entrant sampling (expression loop helpers, velocity probes) where a
//! shared cache borrow is not available.

use crate::bezier::{bezier_ease_uncached, CurveCache};
use crate::error::TimelineError;
use crate::locate::locate;
use crate::path::morph::{morph_paths, prepare_morph_paths, MorphCache, MorphConfig};
use crate::property::{AnimatableProperty, Interpolation, Keyframe};
use crate::value::PropertyValue;

/// Mutable cache borrows threaded through one evaluation call.
pub(crate) struct Caches<'a> {
    pub bezier: &'a mut CurveCache,
    pub morph: &'a mut MorphCache,
}

/// Interpolate a property at `frame` (keyframes 1-5: static fallback,
/// boundary clamp, segment location, easing, typed blend). Expressions are
/// applied by the caller, not here.
pub(crate) fn interpolate_with(
    property: &AnimatableProperty,
    frame: f64,
    caches: Option<Caches<'_>>,
) -> PropertyValue {
    if property.is_static() {
        return property.value.clone();
    }
    let sorted = property.sorted_keyframes();
    sample_keyframes(&sorted, frame, caches)
}

/// Cacheless interpolation, for sampling paths that must not hold the
/// evaluation context's cache borrows.
pub(crate) fn interpolate_uncached(property: &AnimatableProperty, frame: f64) -> PropertyValue {
    interpolate_with(property, frame, None)
}

fn sample_keyframes(sorted: &[Keyframe], frame: f64, caches: Option<Caches<'_>>) -> PropertyValue {
    let first = match sorted.first() {
        Some(kf) => kf,
        None => return PropertyValue::Scalar(0.0),
    };
    let last = sorted.last().unwrap_or(first);

    // Boundary clamp: before the first keyframe and after the last, the
    // timeline holds the boundary value.
    if sorted.len() == 1 || frame <= first.frame as f64 {
        return first.value.clone();
    }
    if frame >= last.frame as f64 {
        return last.value.clone();
    }

    let i = locate(sorted, frame);
    let a = &sorted[i];
    let b = &sorted[i + 1];

    let duration = (b.frame - a.frame) as f64;
    if duration <= 0.0 {
        // A degenerate segment sits entirely at t = 0.
        return a.value.clone();
    }
    let t = ((frame - a.frame as f64) / duration).clamp(0.0, 1.0);

    // The departing keyframe owns the segment's timing.
    let eased = match a.interpolation {
        Interpolation::Hold => return a.value.clone(),
        Interpolation::Linear => t,
        Interpolation::Easing(easing) => easing.apply(t),
        Interpolation::Bezier => {
            // Handle value offsets only normalize against a scalar delta;
            // other shapes fall back to the default vertical profile.
            let value_delta = match (a.value.as_scalar(), b.value.as_scalar()) {
                (Some(av), Some(bv)) => bv - av,
                _ => 0.0,
            };
            match caches {
                Some(c) => {
                    let eased =
                        c.bezier
                            .ease(t, &a.out_handle, &b.in_handle, duration, value_delta);
                    return blend_segment(a, b, eased, Some(c.morph));
                }
                None => bezier_ease_uncached(t, &a.out_handle, &b.in_handle, duration, value_delta),
            }
        }
    };

    let morph = caches.map(|c| c.morph);
    blend_segment(a, b, eased, morph)
}

/// Blend the endpoint values of one segment at eased parameter `t`.
fn blend_segment(
    a: &Keyframe,
    b: &Keyframe,
    t: f64,
    morph: Option<&mut MorphCache>,
) -> PropertyValue {
    if let (PropertyValue::Path(source), PropertyValue::Path(target)) = (&a.value, &b.value) {
        let config = MorphConfig::default();
        let prepared = match morph {
            Some(cache) => cache.prepare(source, target, &config),
            None => prepare_morph_paths(source, target, &config),
        };
        return PropertyValue::Path(morph_paths(&prepared.source, &prepared.target, t));
    }
    a.value.blend(&b.value, t)
}

/// Central-difference velocity in units per second, sampled at half a frame
/// on either side. Shapes without numeric components report zero.
pub(crate) fn velocity(property: &AnimatableProperty, frame: f64, fps: f64) -> PropertyValue {
    let before = interpolate_uncached(property, frame - 0.5);
    let after = interpolate_uncached(property, frame + 0.5);
    // The probes are one frame apart, so the difference scales by fps to
    // become a per-second rate.
    combine(&after, &before, |a, b| (a - b) * fps)
        .unwrap_or_else(|| crate::expr::context::zero_like(&property.value))
}

/// `loopIn` / `loopOut` sampling outside the keyframe span.
///
/// Inside the span this is plain interpolation. Outside it, the requested
/// mode maps the frame back into the span (cycle, pingpong), accumulates a
/// per-cycle offset (offset), or extrapolates the boundary slope (continue).
pub(crate) fn loop_sample(
    property: &AnimatableProperty,
    frame: f64,
    _fps: f64,
    mode: &str,
    inward: bool,
) -> Result<PropertyValue, TimelineError> {
    let sorted = property.sorted_keyframes();
    let (first, last) = match (sorted.first(), sorted.last()) {
        (Some(f), Some(l)) => (f.frame as f64, l.frame as f64),
        _ => return Ok(property.value.clone()),
    };
    let span = last - first;
    let in_range = if inward { frame >= first } else { frame <= last };
    if in_range || span <= 0.0 {
        return Ok(interpolate_uncached(property, frame.clamp(first, last)));
    }
    let sample = |f: f64| interpolate_uncached(property, f);
    let distance = if inward { first - frame } else { frame - last };

    let value = match mode {
        "cycle" => {
            let phase = distance % span;
            if inward {
                sample(last - phase)
            } else {
                sample(first + phase)
            }
        }
        "pingpong" => {
            let phase = distance % (2.0 * span);
            let mapped = if phase <= span {
                if inward {
                    first + phase
                } else {
                    last - phase
                }
            } else if inward {
                last - (phase - span)
            } else {
                first + (phase - span)
            };
            sample(mapped)
        }
        "offset" => {
            let cycles = (distance / span).floor() + 1.0;
            let first_v = sample(first);
            let last_v = sample(last);
            let phase = distance % span;
            let base = if inward {
                sample(last - phase)
            } else {
                sample(first + phase)
            };
            let delta = combine(&last_v, &first_v, |a, b| a - b);
            match delta {
                Some(delta) => {
                    let signed = if inward { -cycles } else { cycles };
                    combine(&base, &delta, |b, d| b + d * signed).unwrap_or(base)
                }
                // Non-numeric shapes cannot accumulate an offset; hold the
                // boundary instead.
                None => sample(if inward { first } else { last }),
            }
        }
        "continue" => {
            let boundary = if inward { first } else { last };
            let at = sample(boundary);
            let probe = if inward {
                sample(boundary + 0.5)
            } else {
                sample(boundary - 0.5)
            };
            // Slope per frame from the half-frame probe, extrapolated
            // linearly past the boundary.
            match combine(&at, &probe, |a, p| (a - p) / 0.5) {
                Some(slope) => combine(&at, &slope, |v, s| v + s * distance).unwrap_or(at),
                None => at,
            }
        }
        other => {
            return Err(TimelineError::ExpressionRuntime {
                message: format!("unknown loop mode '{other}'"),
            })
        }
    };
    Ok(value)
}

/// Componentwise combination of two same-shaped numeric values.
fn combine(
    a: &PropertyValue,
    b: &PropertyValue,
    f: impl Fn(f64, f64) -> f64,
) -> Option<PropertyValue> {
    match (a, b) {
        (PropertyValue::Scalar(a), PropertyValue::Scalar(b)) => {
            Some(PropertyValue::Scalar(f(*a, *b)))
        }
        (PropertyValue::Vec2(a), PropertyValue::Vec2(b)) => {
            Some(PropertyValue::Vec2([f(a[0], b[0]), f(a[1], b[1])]))
        }
        (PropertyValue::Vec3(a), PropertyValue::Vec3(b)) => Some(PropertyValue::Vec3([
            f(a[0], b[0]),
            f(a[1], b[1]),
            f(a[2], b[2]),
        ])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{AnimatableProperty, BezierHandle, Interpolation, Keyframe};
    use approx::assert_relative_eq;

    fn scalar_track(pairs: &[(i32, f64)]) -> AnimatableProperty {
        AnimatableProperty::animated(
            "track",
            pairs
                .iter()
                .map(|&(f, v)| Keyframe::new(f, PropertyValue::Scalar(v)))
                .collect(),
        )
    }

    #[test]
    fn test_linear_midpoint() {
        let prop = scalar_track(&[(0, 0.0), (30, 100.0)]);
        let v = interpolate_uncached(&prop, 15.0);
        assert_eq!(v, PropertyValue::Scalar(50.0));
    }

    #[test]
    fn test_boundary_clamp() {
        let prop = scalar_track(&[(10, 5.0), (20, 15.0)]);
        assert_eq!(interpolate_uncached(&prop, -100.0), PropertyValue::Scalar(5.0));
        assert_eq!(interpolate_uncached(&prop, 500.0), PropertyValue::Scalar(15.0));
    }

    #[test]
    fn test_hold_steps() {
        let mut prop = scalar_track(&[(0, 1.0), (10, 2.0)]);
        prop.keyframes[0].interpolation = Interpolation::Hold;
        assert_eq!(interpolate_uncached(&prop, 9.999), PropertyValue::Scalar(1.0));
        assert_eq!(interpolate_uncached(&prop, 10.0), PropertyValue::Scalar(2.0));
    }

    #[test]
    fn test_static_property_returns_default() {
        let prop = AnimatableProperty::new("static", PropertyValue::Scalar(7.0));
        assert_eq!(interpolate_uncached(&prop, 42.0), PropertyValue::Scalar(7.0));
    }

    #[test]
    fn test_bezier_disabled_handles_match_default_curve() {
        let mut prop = scalar_track(&[(0, 0.0), (10, 10.0)]);
        prop.keyframes[0].interpolation = Interpolation::Bezier;
        let eased = interpolate_uncached(&prop, 5.0);
        let expected = bezier_ease_uncached(
            0.5,
            &BezierHandle::disabled(),
            &BezierHandle::disabled(),
            10.0,
            10.0,
        );
        assert_relative_eq!(eased.as_scalar().unwrap(), expected * 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_duplicate_frame_keyframes_stay_finite() {
        // Two keyframes on the same frame give a zero-length segment. The
        // sample on that frame takes the later value (the search lands past
        // the pair) and nothing divides by the zero duration.
        let prop = scalar_track(&[(0, 0.0), (10, 40.0), (10, 60.0), (20, 100.0)]);
        assert_eq!(interpolate_uncached(&prop, 10.0), PropertyValue::Scalar(60.0));
        assert_relative_eq!(
            interpolate_uncached(&prop, 15.0).as_scalar().unwrap(),
            80.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            interpolate_uncached(&prop, 5.0).as_scalar().unwrap(),
            20.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_unsorted_keyframes_sampled_in_order() {
        let prop = scalar_track(&[(30, 100.0), (0, 0.0)]);
        assert_eq!(interpolate_uncached(&prop, 15.0), PropertyValue::Scalar(50.0));
    }

    #[test]
    fn test_velocity_of_linear_ramp() {
        // 100 units over 30 frames at 30 fps = 100 units/second.
        let prop = scalar_track(&[(0, 0.0), (30, 100.0)]);
        let vel = velocity(&prop, 15.0, 30.0);
        assert_relative_eq!(vel.as_scalar().unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_velocity_zero_outside_span() {
        let prop = scalar_track(&[(0, 0.0), (30, 100.0)]);
        let vel = velocity(&prop, 100.0, 30.0);
        assert_relative_eq!(vel.as_scalar().unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loop_out_cycle() {
        let prop = scalar_track(&[(0, 0.0), (10, 10.0)]);
        let v = loop_sample(&prop, 13.0, 30.0, "cycle", false).unwrap();
        assert_relative_eq!(v.as_scalar().unwrap(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loop_out_pingpong_reverses() {
        let prop = scalar_track(&[(0, 0.0), (10, 10.0)]);
        let v = loop_sample(&prop, 13.0, 30.0, "pingpong", false).unwrap();
        assert_relative_eq!(v.as_scalar().unwrap(), 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loop_out_offset_accumulates() {
        let prop = scalar_track(&[(0, 0.0), (10, 10.0)]);
        let v = loop_sample(&prop, 13.0, 30.0, "offset", false).unwrap();
        assert_relative_eq!(v.as_scalar().unwrap(), 13.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loop_in_cycle() {
        let prop = scalar_track(&[(10, 0.0), (20, 10.0)]);
        let v = loop_sample(&prop, 7.0, 30.0, "cycle", true).unwrap();
        assert_relative_eq!(v.as_scalar().unwrap(), 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loop_continue_extrapolates_slope() {
        let prop = scalar_track(&[(0, 0.0), (10, 10.0)]);
        let v = loop_sample(&prop, 15.0, 30.0, "continue", false).unwrap();
        assert_relative_eq!(v.as_scalar().unwrap(), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loop_unknown_mode_errors() {
        let prop = scalar_track(&[(0, 0.0), (10, 10.0)]);
        assert!(loop_sample(&prop, 15.0, 30.0, "bounce", false).is_err());
    }
}
