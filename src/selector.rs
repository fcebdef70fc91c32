//! Per-character selectors: range, wiggly and expression selectors combined
//! into a single influence weight per character.
//!
//! Influence is a unit weight in `[0, 1]`. Character positions are laid out
//! as percentages along the text; a single character sits at the midpoint.

use crate::expr::context::{ExpressionContext, SelectorBindings};
use crate::expr::noise;
use crate::interp::interpolate_uncached;
use crate::property::AnimatableProperty;
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};

/// Influence profile across a range selector's span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorShape {
    #[default]
    Square,
    RampUp,
    RampDown,
    Triangle,
    Round,
    Smooth,
}

impl SelectorShape {
    /// Profile value at normalized in-range position `u`.
    pub fn apply(self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        match self {
            SelectorShape::Square => 1.0,
            SelectorShape::RampUp => u,
            SelectorShape::RampDown => 1.0 - u,
            SelectorShape::Triangle => 1.0 - (2.0 * u - 1.0).abs(),
            SelectorShape::Round => {
                let x = 2.0 * u - 1.0;
                (1.0 - x * x).max(0.0).sqrt()
            }
            SelectorShape::Smooth => {
                let w = 1.0 - (2.0 * u - 1.0).abs();
                w * w * (3.0 - 2.0 * w)
            }
        }
    }
}

/// How a selector's output folds into the accumulated influence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorMode {
    #[default]
    Add,
    Subtract,
    Intersect,
    Min,
    Max,
    Difference,
}

impl SelectorMode {
    fn combine(self, acc: f64, value: f64) -> f64 {
        match self {
            SelectorMode::Add => acc + value,
            SelectorMode::Subtract => acc - value,
            SelectorMode::Intersect => acc * value,
            SelectorMode::Min => acc.min(value),
            SelectorMode::Max => acc.max(value),
            SelectorMode::Difference => (acc - value).abs(),
        }
    }
}

/// A windowed selector over character positions. Start, end and offset are
/// percentages of the text span and are themselves animatable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSelector {
    #[serde(default)]
    pub mode: SelectorMode,
    #[serde(default)]
    pub shape: SelectorShape,
    pub start: AnimatableProperty,
    pub end: AnimatableProperty,
    pub offset: AnimatableProperty,
}

impl RangeSelector {
    /// Full-span selector `[0, 100]` with no offset.
    pub fn full() -> Self {
        Self {
            mode: SelectorMode::Add,
            shape: SelectorShape::Square,
            start: AnimatableProperty::new("start", PropertyValue::Scalar(0.0)),
            end: AnimatableProperty::new("end", PropertyValue::Scalar(100.0)),
            offset: AnimatableProperty::new("offset", PropertyValue::Scalar(0.0)),
        }
    }

    /// Influence of this selector for a character at `position` percent.
    pub fn influence(&self, position: f64, frame: f64) -> f64 {
        let sample = |prop: &AnimatableProperty| {
            interpolate_uncached(prop, frame).as_scalar().unwrap_or(0.0)
        };
        let offset = sample(&self.offset);
        let start = (sample(&self.start) + offset).rem_euclid(100.0);
        // The end bound wraps into (0, 100] so that a window reaching exactly
        // 100 keeps covering the last character instead of collapsing to 0.
        let raw_end = sample(&self.end) + offset;
        let end = {
            let wrapped = raw_end.rem_euclid(100.0);
            if wrapped == 0.0 && raw_end != 0.0 {
                100.0
            } else {
                wrapped
            }
        };

        let u = if start <= end {
            if position < start || position > end {
                return 0.0;
            }
            let span = end - start;
            if span <= f64::EPSILON {
                0.5
            } else {
                (position - start) / span
            }
        } else {
            // The window wraps through 100 back to 0.
            let span = (100.0 - start) + end;
            if position >= start {
                (position - start) / span
            } else if position <= end {
                ((100.0 - start) + position) / span
            } else {
                return 0.0;
            }
        };
        self.shape.apply(u)
    }
}

/// A deterministic per-character oscillation. `seed` fully determines the
/// phases; nothing here reads a clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WigglySelector {
    #[serde(default)]
    pub mode: SelectorMode,
    /// Upper bound of the oscillation, percent.
    #[serde(rename = "maxAmount")]
    pub max_amount: f64,
    /// Lower bound of the oscillation, percent.
    #[serde(rename = "minAmount")]
    pub min_amount: f64,
    #[serde(rename = "wigglesPerSecond")]
    pub wiggles_per_second: f64,
    /// 0 = every character independent, 100 = all characters in phase.
    pub correlation: f64,
    pub seed: u32,
}

impl WigglySelector {
    pub fn influence(&self, char_index: usize, frame: f64, fps: f64) -> f64 {
        let fps = if fps > 0.0 { fps } else { 1.0 };
        let t = frame / fps;
        // Per-character phase pulled toward the shared phase by correlation.
        let own = noise::random01_pair(self.seed as f64, char_index as u64 + 1);
        let shared = noise::random01(self.seed as f64);
        let k = (self.correlation / 100.0).clamp(0.0, 1.0);
        let phase = (own + (shared - own) * k) * std::f64::consts::TAU;
        let osc = (std::f64::consts::TAU * self.wiggles_per_second * t + phase).sin();
        let min = self.min_amount / 100.0;
        let max = self.max_amount / 100.0;
        min + (max - min) * (osc + 1.0) * 0.5
    }
}

/// A formula-driven selector evaluated per character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSelector {
    #[serde(default)]
    pub mode: SelectorMode,
    pub source: String,
}

/// One selector of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Selector {
    Range(RangeSelector),
    Wiggly(WigglySelector),
    Expression(ExpressionSelector),
}

impl Selector {
    fn mode(&self) -> SelectorMode {
        match self {
            Selector::Range(s) => s.mode,
            Selector::Wiggly(s) => s.mode,
            Selector::Expression(s) => s.mode,
        }
    }
}

/// A selector stack plus the animator-level amount and smoothing applied to
/// the combined influence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnimator {
    pub selectors: Vec<Selector>,
    /// Percent scale on the final influence.
    #[serde(default = "default_amount")]
    pub amount: f64,
    /// Percent pull of the final influence toward the neutral 0.5.
    #[serde(default)]
    pub smoothness: f64,
}

fn default_amount() -> f64 {
    100.0
}

impl TextAnimator {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self {
            selectors,
            amount: 100.0,
            smoothness: 0.0,
        }
    }
}

/// Normalized position of character `i` among `total`, as a percent.
/// A single character has no span to divide, so it sits at the midpoint.
fn character_position(char_index: usize, total_chars: usize) -> f64 {
    if total_chars <= 1 {
        return 50.0;
    }
    char_index as f64 / (total_chars - 1) as f64 * 100.0
}

/// Combined influence of an animator's selector stack for one character.
///
/// Selectors fold left-to-right into an accumulator starting at zero; the
/// result is clamped to `[0, 1]`, scaled by the animator amount, then pulled
/// toward 0.5 by smoothness. An expression selector that fails to evaluate
/// leaves the accumulator unchanged.
pub fn calculate_complete_character_influence(
    animator: &TextAnimator,
    char_index: usize,
    total_chars: usize,
    frame: f64,
    fps: f64,
) -> f64 {
    if total_chars == 0 {
        return 0.0;
    }
    let position = character_position(char_index, total_chars);

    let mut acc = 0.0;
    for selector in &animator.selectors {
        let value = match selector {
            Selector::Range(s) => s.influence(position, frame),
            Selector::Wiggly(s) => s.influence(char_index, frame, fps),
            Selector::Expression(s) => {
                let mut ctx =
                    ExpressionContext::new(frame, fps, 0.0, PropertyValue::Scalar(acc));
                ctx.selector = Some(SelectorBindings {
                    text_index: char_index + 1,
                    text_total: total_chars,
                    selector_value: acc,
                });
                match crate::expr::evaluate_scalar_expression(&s.source, &ctx) {
                    Ok(v) => v,
                    Err(err) => {
                        log::warn!("expression selector failed: {err}");
                        continue;
                    }
                }
            }
        };
        acc = selector.mode().combine(acc, value);
    }

    let clamped = acc.clamp(0.0, 1.0);
    let scaled = clamped * (animator.amount / 100.0);
    let smooth = (animator.smoothness / 100.0).clamp(0.0, 1.0);
    scaled + (0.5 - scaled) * smooth
}
