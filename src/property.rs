//! The animatable property model: keyframes, handles and expression specs.
//!
//! Records here are authored by external edit actions and read-only to the
//! evaluator. Keyframe order is ascending-by-frame by convention; it is not
//! enforced on write, so `validate` rejects violations explicitly and the
//! evaluator re-sorts a local copy defensively when handed unsorted data.

use crate::error::TimelineError;
use crate::ids::{KeyframeId, PropertyId};
use crate::value::{PropertyValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Named easing identifiers usable as a keyframe interpolation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamedEasing {
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
}

/// Interpolation kind of the segment departing a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Hold,
    #[default]
    Linear,
    Bezier,
    Easing(NamedEasing),
}

/// How a keyframe's two handles are coupled in the editor. Carried through
/// the data model; evaluation reads the handles directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ControlMode {
    #[default]
    Auto,
    Smooth,
    Broken,
}

/// A tangent-control offset attached to a keyframe, absolute relative to its
/// owning keyframe. `enabled = false` means the canonical default normalized
/// position (0.33/0.67), not a literal zero offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierHandle {
    /// Frame offset from the owning keyframe.
    pub frame: f64,
    /// Value offset from the owning keyframe.
    pub value: f64,
    pub enabled: bool,
}

impl BezierHandle {
    #[inline]
    pub fn disabled() -> Self {
        Self {
            frame: 0.0,
            value: 0.0,
            enabled: false,
        }
    }

    #[inline]
    pub fn new(frame: f64, value: f64) -> Self {
        Self {
            frame,
            value,
            enabled: true,
        }
    }
}

impl Default for BezierHandle {
    fn default() -> Self {
        Self::disabled()
    }
}

/// A `(frame, value, interpolation, handles)` anchor on a property timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub id: KeyframeId,
    pub frame: i32,
    pub value: PropertyValue,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default, rename = "inHandle")]
    pub in_handle: BezierHandle,
    #[serde(default, rename = "outHandle")]
    pub out_handle: BezierHandle,
    #[serde(default, rename = "controlMode")]
    pub control_mode: ControlMode,
}

impl Keyframe {
    pub fn new(frame: i32, value: PropertyValue) -> Self {
        Self {
            id: KeyframeId::new(),
            frame,
            value,
            interpolation: Interpolation::Linear,
            in_handle: BezierHandle::disabled(),
            out_handle: BezierHandle::disabled(),
            control_mode: ControlMode::Auto,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_handles(mut self, out_handle: BezierHandle, in_handle: BezierHandle) -> Self {
        self.out_handle = out_handle;
        self.in_handle = in_handle;
        self
    }
}

/// An optional per-frame formula attached to a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSpec {
    pub enabled: bool,
    pub source: String,
}

impl ExpressionSpec {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            enabled: true,
            source: source.into(),
        }
    }
}

/// A value that is either static or driven by an ordered keyframe list plus
/// an optional expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatableProperty {
    pub id: PropertyId,
    pub name: String,
    /// Static default, returned whenever the property is not animated.
    pub value: PropertyValue,
    pub animated: bool,
    pub keyframes: Vec<Keyframe>,
    #[serde(default)]
    pub expression: Option<ExpressionSpec>,
}

impl AnimatableProperty {
    /// Static (non-animated) property.
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            id: PropertyId::new(),
            name: name.into(),
            value,
            animated: false,
            keyframes: Vec::new(),
            expression: None,
        }
    }

    /// Animated property from a keyframe list. The static default is the
    /// first keyframe's value when available.
    pub fn animated(name: impl Into<String>, keyframes: Vec<Keyframe>) -> Self {
        let value = keyframes
            .first()
            .map(|k| k.value.clone())
            .unwrap_or(PropertyValue::Scalar(0.0));
        Self {
            id: PropertyId::new(),
            name: name.into(),
            value,
            animated: true,
            keyframes,
            expression: None,
        }
    }

    pub fn with_expression(mut self, expression: ExpressionSpec) -> Self {
        self.expression = Some(expression);
        self
    }

    /// Kind tag of this property's value shape.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Whether evaluation can short-circuit to the static default.
    #[inline]
    pub fn is_static(&self) -> bool {
        !self.animated || self.keyframes.is_empty()
    }

    /// Whether an enabled expression is attached.
    #[inline]
    pub fn has_expression(&self) -> bool {
        self.expression.as_ref().map(|e| e.enabled).unwrap_or(false)
    }

    /// Validate keyframe invariants: strictly ascending, unique frames, and
    /// finite handle offsets. Duplicate or out-of-order frames are rejected
    /// rather than silently tolerated.
    pub fn validate(&self) -> Result<(), TimelineError> {
        let mut last: Option<i32> = None;
        for kf in &self.keyframes {
            if let Some(prev) = last {
                if kf.frame <= prev {
                    return Err(TimelineError::InvalidKeyframes {
                        property: self.name.clone(),
                        reason: format!(
                            "keyframe frames must be strictly ascending ({} after {})",
                            kf.frame, prev
                        ),
                    });
                }
            }
            for handle in [&kf.in_handle, &kf.out_handle] {
                if !handle.frame.is_finite() || !handle.value.is_finite() {
                    return Err(TimelineError::InvalidKeyframes {
                        property: self.name.clone(),
                        reason: format!("non-finite handle offsets at frame {}", kf.frame),
                    });
                }
            }
            if kf.value.kind() != self.value.kind() {
                return Err(TimelineError::InvalidKeyframes {
                    property: self.name.clone(),
                    reason: format!(
                        "keyframe at frame {} has kind {:?}, property is {:?}",
                        kf.frame,
                        kf.value.kind(),
                        self.value.kind()
                    ),
                });
            }
            last = Some(kf.frame);
        }
        Ok(())
    }

    /// Keyframes in ascending frame order. Returns a borrowed view when the
    /// list is already sorted, and a sorted local copy otherwise, so the
    /// evaluator behaves identically for unsorted input.
    pub fn sorted_keyframes(&self) -> Cow<'_, [Keyframe]> {
        if self.keyframes.windows(2).all(|w| w[0].frame <= w[1].frame) {
            Cow::Borrowed(&self.keyframes)
        } else {
            let mut sorted = self.keyframes.clone();
            sorted.sort_by_key(|k| k.frame);
            Cow::Owned(sorted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_keys(frames: &[i32]) -> Vec<Keyframe> {
        frames
            .iter()
            .map(|&f| Keyframe::new(f, PropertyValue::Scalar(f as f64)))
            .collect()
    }

    #[test]
    fn test_validate_accepts_ascending() {
        let prop = AnimatableProperty::animated("x", scalar_keys(&[0, 10, 20]));
        assert!(prop.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_disorder() {
        let prop = AnimatableProperty::animated("x", scalar_keys(&[0, 10, 10]));
        assert!(prop.validate().is_err());
        let prop = AnimatableProperty::animated("x", scalar_keys(&[10, 0]));
        assert!(prop.validate().is_err());
    }

    #[test]
    fn test_sorted_keyframes_defensive_copy() {
        let prop = AnimatableProperty::animated("x", scalar_keys(&[10, 0, 5]));
        let sorted = prop.sorted_keyframes();
        let frames: Vec<i32> = sorted.iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![0, 5, 10]);
        // Already-sorted input borrows without cloning.
        let prop = AnimatableProperty::animated("x", scalar_keys(&[0, 5, 10]));
        assert!(matches!(prop.sorted_keyframes(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_property_serde_roundtrip() {
        let prop = AnimatableProperty::animated("opacity", scalar_keys(&[0, 30]))
            .with_expression(ExpressionSpec::new("value * 2"));
        let json = serde_json::to_string(&prop).unwrap();
        let back: AnimatableProperty = serde_json::from_str(&json).unwrap();
        assert_eq!(prop, back);
    }
}
