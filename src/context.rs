//! The owning evaluation context: per-session caches and the full
//! evaluation pipeline.
//!
//! A context is created per playback session (or per render job) and owns
//! its caches outright. Two contexts never share state, so evaluating two
//! projects concurrently cannot cross-pollute timing curves or prepared
//! morph pairs.

use crate::bezier::CurveCache;
use crate::expr::{self, ExpressionContext, LayerResolver, LayerSnapshot, SplineSampler};
use crate::interp::{self, Caches};
use crate::path::morph::{MorphCache, MorphConfig, PreparedMorphPaths};
use crate::path::BezierPath;
use crate::property::AnimatableProperty;
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};

/// Optional per-call bindings for expression features that reach outside the
/// property being evaluated.
#[derive(Default, Clone, Copy)]
pub struct EvalBindings<'a> {
    /// The layer owning the property, for transform-space conversions.
    pub layer: Option<&'a LayerSnapshot>,
    pub resolver: Option<&'a dyn LayerResolver>,
    pub spline: Option<&'a dyn SplineSampler>,
}

/// Cache occupancy and hit counters, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub bezier_entries: usize,
    pub bezier_hits: u64,
    pub bezier_misses: u64,
    pub morph_entries: usize,
    pub morph_hits: u64,
    pub morph_misses: u64,
}

/// Evaluation session state: frame rate, duration and the owned caches.
pub struct EvalContext {
    fps: f64,
    /// Composition duration in seconds.
    duration: f64,
    bezier: CurveCache,
    morph: MorphCache,
}

impl EvalContext {
    pub fn new(fps: f64, duration: f64) -> Self {
        Self {
            fps: if fps > 0.0 { fps } else { 30.0 },
            duration,
            bezier: CurveCache::new(),
            morph: MorphCache::new(),
        }
    }

    #[inline]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Keyframe interpolation only; any attached expression is ignored.
    pub fn interpolate(&mut self, property: &AnimatableProperty, frame: f64) -> PropertyValue {
        interp::interpolate_with(
            property,
            frame,
            Some(Caches {
                bezier: &mut self.bezier,
                morph: &mut self.morph,
            }),
        )
    }

    /// Full pipeline: interpolate, then apply the property's expression.
    pub fn evaluate(&mut self, property: &AnimatableProperty, frame: f64) -> PropertyValue {
        self.evaluate_with(property, frame, EvalBindings::default())
    }

    /// Full pipeline with layer bindings for cross-layer expression features.
    ///
    /// Expression failure is soft: the interpolated value is returned and
    /// the failure is logged, never propagated.
    pub fn evaluate_with(
        &mut self,
        property: &AnimatableProperty,
        frame: f64,
        bindings: EvalBindings<'_>,
    ) -> PropertyValue {
        let interpolated = self.interpolate(property, frame);
        let spec = match &property.expression {
            Some(spec) if spec.enabled => spec,
            _ => return interpolated,
        };

        let sorted = property.sorted_keyframes();
        let ctx = ExpressionContext {
            time: frame / self.fps,
            frame,
            fps: self.fps,
            duration: self.duration,
            layer: bindings.layer.cloned(),
            property_name: property.name.clone(),
            value: interpolated.clone(),
            velocity: interp::velocity(property, frame, self.fps),
            keyframes: sorted.as_ref(),
            property: Some(property),
            resolver: bindings.resolver,
            spline: bindings.spline,
            selector: None,
        };
        match expr::evaluate_expression(spec, &ctx) {
            Ok(Some(value)) => value,
            Ok(None) => interpolated,
            Err(err) => {
                log::warn!(
                    "expression on '{}' failed at frame {frame}: {err}",
                    property.name
                );
                interpolated
            }
        }
    }

    /// Interpolated value plus central-difference velocity in units/second.
    pub fn sample_with_velocity(
        &mut self,
        property: &AnimatableProperty,
        frame: f64,
    ) -> (PropertyValue, PropertyValue) {
        let value = self.interpolate(property, frame);
        let velocity = interp::velocity(property, frame, self.fps);
        (value, velocity)
    }

    /// Prepared (count-matched, correspondence-resolved) morph pair, through
    /// the cache.
    pub fn prepare_morph_paths(
        &mut self,
        source: &BezierPath,
        target: &BezierPath,
        config: &MorphConfig,
    ) -> PreparedMorphPaths {
        self.morph.prepare(source, target, config)
    }

    /// Blend two paths at `t`, preparing them through the cache first.
    pub fn morph_paths(
        &mut self,
        source: &BezierPath,
        target: &BezierPath,
        t: f64,
        config: &MorphConfig,
    ) -> BezierPath {
        let prepared = self.morph.prepare(source, target, config);
        crate::path::morph::morph_paths(&prepared.source, &prepared.target, t)
    }

    pub fn clear_bezier_cache(&mut self) {
        self.bezier.clear();
    }

    pub fn clear_path_morph_cache(&mut self) {
        self.morph.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            bezier_entries: self.bezier.len(),
            bezier_hits: self.bezier.hits(),
            bezier_misses: self.bezier.misses(),
            morph_entries: self.morph.len(),
            morph_hits: self.morph.hits(),
            morph_misses: self.morph.misses(),
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new(30.0, 0.0)
    }
}
