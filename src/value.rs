//! Typed property values and blend helpers.
//!
//! The value shape is a tagged variant chosen once at property construction,
//! so per-frame evaluation dispatches on the discriminant instead of
//! re-inspecting a dynamic value every call.

use crate::error::TimelineError;
use crate::path::BezierPath;
use serde::{Deserialize, Serialize};

/// Enum representing the type of a `PropertyValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Scalar,
    Vec2,
    Vec3,
    Color,
    Path,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Scalar => "Scalar",
            ValueKind::Vec2 => "Vec2",
            ValueKind::Vec3 => "Vec3",
            ValueKind::Color => "Color",
            ValueKind::Path => "Path",
        }
    }
}

/// An RGB color, serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[inline]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` (or `rrggbb`) hex string.
    pub fn from_hex(input: &str) -> Result<Self, TimelineError> {
        let hex = input.strip_prefix('#').unwrap_or(input);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TimelineError::ColorParse {
                input: input.to_string(),
            });
        }
        let parse = |s: &str| u8::from_str_radix(s, 16);
        match (parse(&hex[0..2]), parse(&hex[2..4]), parse(&hex[4..6])) {
            (Ok(r), Ok(g), Ok(b)) => Ok(Self { r, g, b }),
            _ => Err(TimelineError::ColorParse {
                input: input.to_string(),
            }),
        }
    }

    /// Format as a lowercase `#rrggbb` string.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Per-channel integer blend with rounding.
    pub fn blend(self, other: Rgb, t: f64) -> Rgb {
        let ch = |a: u8, b: u8| -> u8 {
            let v = a as f64 + (b as f64 - a as f64) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: ch(self.r, other.r),
            g: ch(self.g, other.g),
            b: ch(self.b, other.b),
        }
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgb::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Primary value type for animatable properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PropertyValue {
    /// Scalar number
    Scalar(f64),
    /// 2D vector
    Vec2([f64; 2]),
    /// 3D vector
    Vec3([f64; 3]),
    /// RGB color
    Color(Rgb),
    /// Vector path (blended by the morphing subsystem)
    Path(BezierPath),
}

#[inline]
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl PropertyValue {
    /// Get the kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Scalar(_) => ValueKind::Scalar,
            PropertyValue::Vec2(_) => ValueKind::Vec2,
            PropertyValue::Vec3(_) => ValueKind::Vec3,
            PropertyValue::Color(_) => ValueKind::Color,
            PropertyValue::Path(_) => ValueKind::Path,
        }
    }

    /// Scalar accessor (None for non-scalar values).
    #[inline]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            PropertyValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// View the numeric components of this value, if it has any.
    pub fn components(&self) -> Option<Vec<f64>> {
        match self {
            PropertyValue::Scalar(v) => Some(vec![*v]),
            PropertyValue::Vec2(v) => Some(v.to_vec()),
            PropertyValue::Vec3(v) => Some(v.to_vec()),
            PropertyValue::Color(c) => Some(vec![c.r as f64, c.g as f64, c.b as f64]),
            PropertyValue::Path(_) => None,
        }
    }

    /// Blend two values at parameter `t`.
    ///
    /// Numbers blend linearly, vectors component-wise (a missing `z` fades
    /// toward/from 0 across the 2D/3D transition), colors per channel with
    /// integer rounding. Paths are blended by the morphing subsystem, not
    /// here; any unrecognized pairing degrades to a step function.
    pub fn blend(&self, other: &PropertyValue, t: f64) -> PropertyValue {
        match (self, other) {
            (PropertyValue::Scalar(a), PropertyValue::Scalar(b)) => {
                PropertyValue::Scalar(lerp(*a, *b, t))
            }
            (PropertyValue::Vec2(a), PropertyValue::Vec2(b)) => {
                PropertyValue::Vec2([lerp(a[0], b[0], t), lerp(a[1], b[1], t)])
            }
            (PropertyValue::Vec3(a), PropertyValue::Vec3(b)) => PropertyValue::Vec3([
                lerp(a[0], b[0], t),
                lerp(a[1], b[1], t),
                lerp(a[2], b[2], t),
            ]),
            // 2D -> 3D transition: fade z in from 0.
            (PropertyValue::Vec2(a), PropertyValue::Vec3(b)) => PropertyValue::Vec3([
                lerp(a[0], b[0], t),
                lerp(a[1], b[1], t),
                lerp(0.0, b[2], t),
            ]),
            // 3D -> 2D transition: fade z out toward 0.
            (PropertyValue::Vec3(a), PropertyValue::Vec2(b)) => PropertyValue::Vec3([
                lerp(a[0], b[0], t),
                lerp(a[1], b[1], t),
                lerp(a[2], 0.0, t),
            ]),
            (PropertyValue::Color(a), PropertyValue::Color(b)) => {
                PropertyValue::Color(a.blend(*b, t))
            }
            // Step fallback for unrecognized pairings (including paths, which
            // callers route through the morphing subsystem instead).
            _ => {
                if t < 0.5 {
                    self.clone()
                } else {
                    other.clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let c = Rgb::from_hex("#3fa0c8").unwrap();
        assert_eq!(c, Rgb::new(0x3f, 0xa0, 0xc8));
        assert_eq!(c.to_hex(), "#3fa0c8");
        assert!(Rgb::from_hex("zzz").is_err());
        assert!(Rgb::from_hex("#12345").is_err());
    }

    #[test]
    fn test_color_blend_is_idempotent() {
        let c = Rgb::new(10, 200, 33);
        for t in [0.0, 0.25, 0.5, 0.99, 1.0] {
            assert_eq!(c.blend(c, t), c);
        }
    }

    #[test]
    fn test_scalar_blend() {
        let a = PropertyValue::Scalar(0.0);
        let b = PropertyValue::Scalar(10.0);
        assert_eq!(a.blend(&b, 0.5), PropertyValue::Scalar(5.0));
    }

    #[test]
    fn test_dimension_transition_fades_z() {
        let a = PropertyValue::Vec2([0.0, 0.0]);
        let b = PropertyValue::Vec3([10.0, 10.0, 4.0]);
        assert_eq!(a.blend(&b, 0.5), PropertyValue::Vec3([5.0, 5.0, 2.0]));

        let a = PropertyValue::Vec3([0.0, 0.0, 8.0]);
        let b = PropertyValue::Vec2([10.0, 10.0]);
        assert_eq!(a.blend(&b, 0.25), PropertyValue::Vec3([2.5, 2.5, 6.0]));
    }

    #[test]
    fn test_mismatched_shapes_step() {
        let a = PropertyValue::Scalar(1.0);
        let b = PropertyValue::Color(Rgb::new(0, 0, 0));
        assert_eq!(a.blend(&b, 0.4), a);
        assert_eq!(a.blend(&b, 0.6), b);
    }
}
