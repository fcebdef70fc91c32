//! Named easing functions mapping a raw segment parameter to an eased one.

use crate::property::NamedEasing;
use std::f64::consts::FRAC_PI_2;

impl NamedEasing {
    /// Apply this easing to `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            NamedEasing::EaseInQuad => t * t,
            NamedEasing::EaseOutQuad => t * (2.0 - t),
            NamedEasing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            NamedEasing::EaseInCubic => t * t * t,
            NamedEasing::EaseOutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            NamedEasing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
            NamedEasing::EaseInQuart => t * t * t * t,
            NamedEasing::EaseOutQuart => {
                let u = t - 1.0;
                1.0 - u * u * u * u
            }
            NamedEasing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    let u = t - 1.0;
                    1.0 - 8.0 * u * u * u * u
                }
            }
            NamedEasing::EaseInSine => 1.0 - (t * FRAC_PI_2).cos(),
            NamedEasing::EaseOutSine => (t * FRAC_PI_2).sin(),
            NamedEasing::EaseInOutSine => 0.5 * (1.0 - (std::f64::consts::PI * t).cos()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ALL: [NamedEasing; 12] = [
        NamedEasing::EaseInQuad,
        NamedEasing::EaseOutQuad,
        NamedEasing::EaseInOutQuad,
        NamedEasing::EaseInCubic,
        NamedEasing::EaseOutCubic,
        NamedEasing::EaseInOutCubic,
        NamedEasing::EaseInQuart,
        NamedEasing::EaseOutQuart,
        NamedEasing::EaseInOutQuart,
        NamedEasing::EaseInSine,
        NamedEasing::EaseOutSine,
        NamedEasing::EaseInOutSine,
    ];

    #[test]
    fn test_easings_fix_endpoints() {
        for easing in ALL {
            assert_relative_eq!(easing.apply(0.0), 0.0, epsilon = 1e-12);
            assert_relative_eq!(easing.apply(1.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_easings_stay_in_unit_range() {
        for easing in ALL {
            for i in 0..=100 {
                let v = easing.apply(i as f64 / 100.0);
                assert!((-1e-9..=1.0 + 1e-9).contains(&v), "{easing:?} escaped at {i}");
            }
        }
    }

    #[test]
    fn test_ease_in_out_symmetry() {
        assert_relative_eq!(NamedEasing::EaseInOutQuad.apply(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(NamedEasing::EaseInOutCubic.apply(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(NamedEasing::EaseInOutSine.apply(0.5), 0.5, epsilon = 1e-12);
    }
}
