//! Deterministic timeline evaluation for keyframed motion graphics.
//!
//! The crate answers one question: what is the value of a property at a
//! frame? Evaluation is a pure function of the property data, the frame and
//! the owning [`EvalContext`] — no clocks, no global state — so scrubbing
//! backwards, seeking and re-rendering always reproduce identical output.
//!
//! The pipeline: keyframe lookup, typed interpolation with cubic-bezier or
//! named easing, vector-path morphing for path-valued segments, then an
//! optional sandboxed expression post-process. Per-character influence for
//! text animation is computed by the [`selector`] module on top of the same
//! primitives.

pub mod bezier;
pub mod context;
pub mod easing;
pub mod error;
pub mod expr;
pub mod ids;
mod interp;
mod locate;
pub mod path;
pub mod property;
pub mod selector;
pub mod value;

// Re-exports for consumers
pub use bezier::{CurveCache, UnitBezier, BEZIER_CACHE_CAPACITY};
pub use context::{CacheStats, EvalBindings, EvalContext};
pub use error::TimelineError;
pub use expr::{
    evaluate_custom_expression, validate_expression, ExpressionContext, LayerResolver,
    LayerSnapshot, SelectorBindings, SplineSample, SplineSampler, TransformSnapshot,
};
pub use ids::{KeyframeId, LayerId, PropertyId};
pub use path::morph::{
    morph_paths, prepare_morph_paths, MatchStrategy, MorphCache, MorphConfig, PreparedMorphPaths,
    MORPH_CACHE_CAPACITY,
};
pub use path::{BezierPath, BezierVertex};
pub use property::{
    AnimatableProperty, BezierHandle, ControlMode, ExpressionSpec, Interpolation, Keyframe,
    NamedEasing,
};
pub use selector::{
    calculate_complete_character_influence, ExpressionSelector, RangeSelector, Selector,
    SelectorMode, SelectorShape, TextAnimator, WigglySelector,
};
pub use value::{PropertyValue, Rgb, ValueKind};
