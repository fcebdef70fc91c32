//! Sandboxed per-frame expression evaluation.
//!
//! Formulas are parsed to an AST once per call and interpreted against an
//! [`ExpressionContext`] carrying the enumerated binding surface. There is
//! no host scripting engine behind this: evaluation is pure, deterministic,
//! and bounded by a step budget.

pub mod ast;
pub mod context;
mod eval;
mod lexer;
mod parser;
pub(crate) mod noise;

pub use context::{
    ExpressionContext, LayerResolver, LayerSnapshot, SelectorBindings, SplineSample,
    SplineSampler, TransformSnapshot,
};
pub use eval::{ExprValue, STEP_BUDGET};

use crate::error::TimelineError;
use crate::property::ExpressionSpec;
use crate::value::PropertyValue;
use ast::{Expr, Stmt, MAX_DEPTH};
use eval::Evaluator;

/// Identifiers bound by the evaluation context.
const KNOWN_BINDINGS: &[&str] = &[
    "time",
    "frame",
    "fps",
    "duration",
    "value",
    "velocity",
    "numKeys",
    "name",
    "textIndex",
    "textTotal",
    "selectorValue",
    "PI",
    "E",
];

/// Callable builtins.
const KNOWN_FUNCTIONS: &[&str] = &[
    "abs",
    "floor",
    "ceil",
    "round",
    "sqrt",
    "sin",
    "cos",
    "tan",
    "asin",
    "acos",
    "atan",
    "atan2",
    "exp",
    "log",
    "pow",
    "min",
    "max",
    "clamp",
    "linear",
    "add",
    "sub",
    "mul",
    "div",
    "dot",
    "cross",
    "length",
    "normalize",
    "degreesToRadians",
    "radiansToDegrees",
    "key",
    "nearestKey",
    "random",
    "noise",
    "wiggle",
    "loopIn",
    "loopOut",
    "toComp",
    "fromComp",
    "toWorld",
    "fromWorld",
    "pathPoint",
    "pathTangent",
    "layer",
];

/// Evaluate a property's attached expression, if enabled.
///
/// Returns `Ok(None)` when the spec is disabled or empty.
pub fn evaluate_expression(
    spec: &ExpressionSpec,
    ctx: &ExpressionContext<'_>,
) -> Result<Option<PropertyValue>, TimelineError> {
    if !spec.enabled || spec.source.trim().is_empty() {
        return Ok(None);
    }
    evaluate_custom_expression(&spec.source, ctx).map(Some)
}

/// Parse and evaluate a formula, shaping the result like the context's
/// pre-expression value.
pub fn evaluate_custom_expression(
    source: &str,
    ctx: &ExpressionContext<'_>,
) -> Result<PropertyValue, TimelineError> {
    let program = parser::parse(source)?;
    let result = Evaluator::new(ctx).run(&program)?;
    result.into_property(ctx.value.kind())
}

/// Evaluate a formula that must produce a scalar, for expression selectors.
pub(crate) fn evaluate_scalar_expression(
    source: &str,
    ctx: &ExpressionContext<'_>,
) -> Result<f64, TimelineError> {
    let program = parser::parse(source)?;
    match Evaluator::new(ctx).run(&program)? {
        ExprValue::Num(n) => Ok(n),
        ExprValue::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
        other => Err(TimelineError::ExpressionRuntime {
            message: format!("selector expression must yield a number, got {other:?}"),
        }),
    }
}

/// Static validation: parse and check every identifier and call target
/// against the known binding surface, without evaluating anything.
pub fn validate_expression(source: &str) -> Result<(), TimelineError> {
    let program = parser::parse(source)?;
    let mut assigned: Vec<&str> = Vec::new();
    for stmt in &program.stmts {
        match stmt {
            Stmt::Assign { name, expr } => {
                check_expr(expr, &assigned, 0)?;
                assigned.push(name);
            }
            Stmt::Expr(expr) => check_expr(expr, &assigned, 0)?,
        }
    }
    Ok(())
}

fn check_expr(expr: &Expr, assigned: &[&str], depth: usize) -> Result<(), TimelineError> {
    if depth > MAX_DEPTH {
        return Err(TimelineError::ExpressionRuntime {
            message: "expression nested too deeply".into(),
        });
    }
    let depth = depth + 1;
    match expr {
        Expr::Num(_) | Expr::Str(_) => Ok(()),
        Expr::Ident { name, pos } => {
            if KNOWN_BINDINGS.contains(&name.as_str()) || assigned.contains(&name.as_str()) {
                Ok(())
            } else {
                Err(TimelineError::ExpressionParse {
                    line: pos.line,
                    column: pos.column,
                    message: format!("unknown identifier '{name}'"),
                })
            }
        }
        Expr::Array(items) => {
            for item in items {
                check_expr(item, assigned, depth)?;
            }
            Ok(())
        }
        Expr::Unary { expr, .. } => check_expr(expr, assigned, depth),
        Expr::Binary { lhs, rhs, .. } => {
            check_expr(lhs, assigned, depth)?;
            check_expr(rhs, assigned, depth)
        }
        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            check_expr(cond, assigned, depth)?;
            check_expr(then, assigned, depth)?;
            check_expr(otherwise, assigned, depth)
        }
        Expr::Call { name, args, pos } => {
            if !KNOWN_FUNCTIONS.contains(&name.as_str()) {
                return Err(TimelineError::ExpressionParse {
                    line: pos.line,
                    column: pos.column,
                    message: format!("unknown function '{name}'"),
                });
            }
            for arg in args {
                check_expr(arg, assigned, depth)?;
            }
            Ok(())
        }
        // Member and method names depend on the runtime object shape, so
        // static validation only descends into the object and arguments.
        Expr::Member { object, .. } => check_expr(object, assigned, depth),
        Expr::MethodCall { object, args, .. } => {
            check_expr(object, assigned, depth)?;
            for arg in args {
                check_expr(arg, assigned, depth)?;
            }
            Ok(())
        }
        Expr::Index { object, index } => {
            check_expr(object, assigned, depth)?;
            check_expr(index, assigned, depth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertyValue;

    fn scalar_ctx(value: f64) -> ExpressionContext<'static> {
        ExpressionContext::new(15.0, 30.0, 10.0, PropertyValue::Scalar(value))
    }

    #[test]
    fn test_arithmetic_over_value() {
        let ctx = scalar_ctx(10.0);
        let out = evaluate_custom_expression("value * 2 + 5", &ctx).unwrap();
        assert_eq!(out, PropertyValue::Scalar(25.0));
    }

    #[test]
    fn test_statements_with_assignment() {
        let ctx = scalar_ctx(1.0);
        let out = evaluate_custom_expression("amp = 3; freq = 2; value + amp * freq", &ctx).unwrap();
        assert_eq!(out, PropertyValue::Scalar(7.0));
    }

    #[test]
    fn test_time_and_frame_bindings() {
        let ctx = scalar_ctx(0.0);
        let out = evaluate_custom_expression("time", &ctx).unwrap();
        assert_eq!(out, PropertyValue::Scalar(0.5));
        let out = evaluate_custom_expression("frame / fps", &ctx).unwrap();
        assert_eq!(out, PropertyValue::Scalar(0.5));
    }

    #[test]
    fn test_ternary_and_comparison() {
        let ctx = scalar_ctx(0.0);
        let out = evaluate_custom_expression("time > 0.25 ? 100 : -100", &ctx).unwrap();
        assert_eq!(out, PropertyValue::Scalar(100.0));
    }

    #[test]
    fn test_vector_result_for_vec_property() {
        let ctx = ExpressionContext::new(0.0, 30.0, 10.0, PropertyValue::Vec2([1.0, 2.0]));
        let out = evaluate_custom_expression("value + [10, 20]", &ctx).unwrap();
        assert_eq!(out, PropertyValue::Vec2([11.0, 22.0]));
    }

    #[test]
    fn test_unknown_identifier_is_error() {
        let ctx = scalar_ctx(0.0);
        assert!(evaluate_custom_expression("thisLayerDoesNotExist", &ctx).is_err());
    }

    #[test]
    fn test_budget_enforced() {
        let ctx = scalar_ctx(0.0);
        // Many shallow statements keep each tree small while the total step
        // count runs comfortably past the budget.
        let mut source = String::from("x = 0");
        for _ in 0..40_000 {
            source.push_str("; x = x + 1");
        }
        let err = evaluate_custom_expression(&source, &ctx).unwrap_err();
        assert!(matches!(err, TimelineError::ExpressionBudgetExceeded { .. }));
    }

    #[test]
    fn test_deep_operator_chain_is_an_error_not_a_crash() {
        let ctx = scalar_ctx(0.0);
        // A single left-nested chain far past the nesting cap. It must come
        // back as an ordinary error; unbounded recursion here would take the
        // whole thread down instead.
        let mut source = String::from("0");
        for _ in 0..60_000 {
            source.push_str("+1");
        }
        let err = evaluate_custom_expression(&source, &ctx).unwrap_err();
        assert!(matches!(err, TimelineError::ExpressionRuntime { .. }));
    }

    #[test]
    fn test_deeply_grouped_expression_fails_to_parse() {
        let mut source = String::new();
        for _ in 0..2_000 {
            source.push('(');
        }
        source.push('1');
        for _ in 0..2_000 {
            source.push(')');
        }
        let err = evaluate_custom_expression(&source, &scalar_ctx(0.0)).unwrap_err();
        assert!(matches!(err, TimelineError::ExpressionParse { .. }));
    }

    #[test]
    fn test_validate_rejects_excessive_nesting() {
        let mut source = String::from("0");
        for _ in 0..60_000 {
            source.push_str("+1");
        }
        assert!(validate_expression(&source).is_err());
    }

    #[test]
    fn test_validate_accepts_known_surface() {
        assert!(validate_expression("wiggle(2, 30) + value").is_ok());
        assert!(validate_expression("a = sin(time); a * 2").is_ok());
    }

    #[test]
    fn test_validate_rejects_unknowns_with_position() {
        let err = validate_expression("value + bogusBinding").unwrap_err();
        match err {
            TimelineError::ExpressionParse { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(validate_expression("bogusFn(1)").is_err());
    }

    #[test]
    fn test_random_deterministic_per_seed() {
        let ctx = scalar_ctx(0.0);
        let a = evaluate_custom_expression("random(12)", &ctx).unwrap();
        let b = evaluate_custom_expression("random(12)", &ctx).unwrap();
        assert_eq!(a, b);
        let c = evaluate_custom_expression("random(13)", &ctx).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_wiggle_deterministic() {
        let ctx = scalar_ctx(5.0);
        let a = evaluate_custom_expression("wiggle(2, 30)", &ctx).unwrap();
        let b = evaluate_custom_expression("wiggle(2, 30)", &ctx).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_disabled_spec_short_circuits() {
        let spec = ExpressionSpec {
            enabled: false,
            source: "value * 2".into(),
        };
        let ctx = scalar_ctx(1.0);
        assert_eq!(evaluate_expression(&spec, &ctx).unwrap(), None);
    }
}
