//! Evaluation context for expressions: the fixed binding surface.
//!
//! A context is constructed fresh per evaluation call and never retained
//! across frames. It carries only the enumerated bindings — there is no
//! ambient access to evaluator internals from a formula.

use crate::ids::LayerId;
use crate::property::{AnimatableProperty, Keyframe};
use crate::value::PropertyValue;
use nalgebra::{Matrix4, Rotation3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A layer's transform at the evaluated frame. Rotation is in degrees,
/// applied Z, then Y, then X; scale is a factor (1.0 = 100%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSnapshot {
    pub anchor: [f64; 3],
    pub position: [f64; 3],
    pub scale: [f64; 3],
    pub rotation: [f64; 3],
    #[serde(default)]
    pub parent: Option<LayerId>,
}

impl Default for TransformSnapshot {
    fn default() -> Self {
        Self {
            anchor: [0.0; 3],
            position: [0.0; 3],
            scale: [1.0; 3],
            rotation: [0.0; 3],
            parent: None,
        }
    }
}

impl TransformSnapshot {
    /// Layer-local -> parent-space matrix:
    /// anchor offset, then scale, then Z/Y/X rotation, then translation.
    pub fn local_matrix(&self) -> Matrix4<f64> {
        let translation = Matrix4::new_translation(&Vector3::from(self.position));
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), self.rotation[0].to_radians())
            * Rotation3::from_axis_angle(&Vector3::y_axis(), self.rotation[1].to_radians())
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.rotation[2].to_radians());
        let scale = Matrix4::new_nonuniform_scaling(&Vector3::from(self.scale));
        let anchor = Matrix4::new_translation(&-Vector3::from(self.anchor));
        translation * rotation.to_homogeneous() * scale * anchor
    }
}

/// A read-only snapshot of a sibling layer exposed to expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub id: LayerId,
    pub name: String,
    pub index: usize,
    pub transform: TransformSnapshot,
    pub opacity: f64,
}

/// Injected resolver for sibling-layer transforms and effect parameters.
/// The engine only reads through this interface; it never mutates layers.
pub trait LayerResolver {
    fn layer_by_name(&self, name: &str) -> Option<LayerSnapshot>;
    fn layer_by_index(&self, index: usize) -> Option<LayerSnapshot>;
    fn layer_by_id(&self, id: LayerId) -> Option<LayerSnapshot>;
    /// Current value of an effect parameter on a layer, if present.
    fn effect_value(&self, layer: &str, effect: &str, param: &str) -> Option<PropertyValue>;
    /// Optional composition -> world transform (identity when absent).
    fn comp_to_world(&self) -> Option<TransformSnapshot> {
        None
    }
}

/// A sampled point on a spline, for path-following features built atop the
/// core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplineSample {
    pub point: [f64; 2],
    pub tangent: [f64; 2],
}

/// Injected provider of spline samples `(layer, t, frame) -> {point, tangent}`.
pub trait SplineSampler {
    fn sample(&self, layer: LayerId, t: f64, frame: f64) -> Option<SplineSample>;
}

/// Character-scoped bindings for expression selectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorBindings {
    /// 1-based character index.
    pub text_index: usize,
    pub text_total: usize,
    /// Influence accumulated by the preceding selectors.
    pub selector_value: f64,
}

/// The fixed context handed to one expression evaluation.
pub struct ExpressionContext<'a> {
    /// Seconds at the evaluated frame.
    pub time: f64,
    pub frame: f64,
    pub fps: f64,
    /// Composition duration in seconds.
    pub duration: f64,
    /// Owning layer, when known.
    pub layer: Option<LayerSnapshot>,
    pub property_name: String,
    /// Interpolated value before the expression runs.
    pub value: PropertyValue,
    /// Central-difference velocity (units per second) at the evaluated frame.
    pub velocity: PropertyValue,
    /// The property's own keyframes, ascending by frame.
    pub keyframes: &'a [Keyframe],
    /// The owning property, for loop helpers that re-sample it.
    pub property: Option<&'a AnimatableProperty>,
    pub resolver: Option<&'a dyn LayerResolver>,
    pub spline: Option<&'a dyn SplineSampler>,
    pub selector: Option<SelectorBindings>,
}

impl<'a> ExpressionContext<'a> {
    /// Minimal context over an interpolated value.
    pub fn new(frame: f64, fps: f64, duration: f64, value: PropertyValue) -> Self {
        let fps = if fps > 0.0 { fps } else { 1.0 };
        Self {
            time: frame / fps,
            frame,
            fps,
            duration,
            layer: None,
            property_name: String::new(),
            value: value.clone(),
            velocity: zero_like(&value),
            keyframes: &[],
            property: None,
            resolver: None,
            spline: None,
            selector: None,
        }
    }

    /// Layer-local -> composition matrix through the parent chain.
    pub fn to_comp_matrix(&self) -> Matrix4<f64> {
        let mut matrix = Matrix4::identity();
        let mut current = self.layer.as_ref().map(|l| l.transform);
        // Parent chains are authored shallow; the depth cap only guards
        // against a malformed cyclic chain.
        let mut depth = 0;
        while let Some(transform) = current {
            matrix = transform.local_matrix() * matrix;
            depth += 1;
            if depth > 64 {
                break;
            }
            current = transform
                .parent
                .and_then(|id| self.resolver.and_then(|r| r.layer_by_id(id)))
                .map(|l| l.transform);
        }
        matrix
    }

    /// Composition -> world matrix (identity unless the resolver supplies one).
    pub fn comp_to_world_matrix(&self) -> Matrix4<f64> {
        self.resolver
            .and_then(|r| r.comp_to_world())
            .map(|t| t.local_matrix())
            .unwrap_or_else(Matrix4::identity)
    }
}

/// Apply a homogeneous transform to a 3-component point.
pub(crate) fn transform_point(matrix: &Matrix4<f64>, p: [f64; 3]) -> [f64; 3] {
    let v = matrix * Vector4::new(p[0], p[1], p[2], 1.0);
    [v.x, v.y, v.z]
}

/// A zero value with the same shape as `value`.
pub(crate) fn zero_like(value: &PropertyValue) -> PropertyValue {
    match value {
        PropertyValue::Scalar(_) => PropertyValue::Scalar(0.0),
        PropertyValue::Vec2(_) => PropertyValue::Vec2([0.0; 2]),
        PropertyValue::Vec3(_) => PropertyValue::Vec3([0.0; 3]),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_transform() {
        let t = TransformSnapshot::default();
        let p = transform_point(&t.local_matrix(), [3.0, 4.0, 5.0]);
        assert_relative_eq!(p[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 4.0, epsilon = 1e-12);
        assert_relative_eq!(p[2], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_order_anchor_scale_rotate_translate() {
        let t = TransformSnapshot {
            anchor: [1.0, 0.0, 0.0],
            position: [10.0, 0.0, 0.0],
            scale: [2.0, 2.0, 2.0],
            rotation: [0.0, 0.0, 90.0],
            parent: None,
        };
        // Point at the anchor maps exactly to the position.
        let p = transform_point(&t.local_matrix(), [1.0, 0.0, 0.0]);
        assert_relative_eq!(p[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(p[1], 0.0, epsilon = 1e-9);
        // One unit right of the anchor: scaled to 2, rotated 90deg about Z.
        let p = transform_point(&t.local_matrix(), [2.0, 0.0, 0.0]);
        assert_relative_eq!(p[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(p[1], 2.0, epsilon = 1e-9);
    }
}
