//! Tree-walking interpreter for parsed formulas.
//!
//! The interpreter sees only the enumerated binding surface carried by
//! `ExpressionContext`; every evaluation is capped by an explicit step
//! budget so a pathological formula cannot stall the calling frame.

use super::ast::{BinaryOp, Expr, Pos, Program, Stmt, UnaryOp, MAX_DEPTH};
use super::context::{transform_point, ExpressionContext, LayerSnapshot};
use super::noise;
use crate::error::TimelineError;
use crate::property::Keyframe;
use crate::value::{PropertyValue, Rgb, ValueKind};
use std::collections::HashMap;

/// Steps allowed per evaluation.
pub const STEP_BUDGET: u32 = 100_000;

/// Runtime value inside the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Num(f64),
    Bool(bool),
    Str(String),
    Vec(Vec<f64>),
    Key {
        index: usize,
        frame: f64,
        value: Box<ExprValue>,
    },
    Layer(LayerSnapshot),
}

impl ExprValue {
    fn type_name(&self) -> &'static str {
        match self {
            ExprValue::Num(_) => "number",
            ExprValue::Bool(_) => "bool",
            ExprValue::Str(_) => "string",
            ExprValue::Vec(_) => "vector",
            ExprValue::Key { .. } => "keyframe",
            ExprValue::Layer(_) => "layer",
        }
    }

    fn truthy(&self) -> bool {
        match self {
            ExprValue::Bool(b) => *b,
            ExprValue::Num(n) => *n != 0.0,
            _ => true,
        }
    }

    /// Convert an interpolated property value into its expression shape.
    pub fn from_property(value: &PropertyValue) -> Option<ExprValue> {
        match value {
            PropertyValue::Scalar(v) => Some(ExprValue::Num(*v)),
            PropertyValue::Vec2(v) => Some(ExprValue::Vec(v.to_vec())),
            PropertyValue::Vec3(v) => Some(ExprValue::Vec(v.to_vec())),
            PropertyValue::Color(c) => {
                Some(ExprValue::Vec(vec![c.r as f64, c.g as f64, c.b as f64]))
            }
            // Paths have no expression shape; the evaluator skips expression
            // post-processing for path properties.
            PropertyValue::Path(_) => None,
        }
    }

    /// Convert back into a property value of the expected kind.
    pub fn into_property(self, expected: ValueKind) -> Result<PropertyValue, TimelineError> {
        let mismatch = |value: &ExprValue| TimelineError::ExpressionRuntime {
            message: format!(
                "expression produced {} where {:?} was expected",
                value.type_name(),
                expected
            ),
        };
        match (expected, &self) {
            (ValueKind::Scalar, ExprValue::Num(n)) => Ok(PropertyValue::Scalar(*n)),
            (ValueKind::Scalar, ExprValue::Bool(b)) => {
                Ok(PropertyValue::Scalar(if *b { 1.0 } else { 0.0 }))
            }
            (ValueKind::Vec2, ExprValue::Vec(v)) if v.len() >= 2 => {
                Ok(PropertyValue::Vec2([v[0], v[1]]))
            }
            (ValueKind::Vec3, ExprValue::Vec(v)) if v.len() >= 3 => {
                Ok(PropertyValue::Vec3([v[0], v[1], v[2]]))
            }
            (ValueKind::Vec3, ExprValue::Vec(v)) if v.len() == 2 => {
                Ok(PropertyValue::Vec3([v[0], v[1], 0.0]))
            }
            (ValueKind::Color, ExprValue::Vec(v)) if v.len() >= 3 => {
                let ch = |x: f64| x.round().clamp(0.0, 255.0) as u8;
                Ok(PropertyValue::Color(Rgb::new(ch(v[0]), ch(v[1]), ch(v[2]))))
            }
            _ => Err(mismatch(&self)),
        }
    }
}

pub(crate) struct Evaluator<'a, 'c> {
    ctx: &'a ExpressionContext<'c>,
    vars: HashMap<String, ExprValue>,
    steps: u32,
    depth: usize,
}

fn runtime(message: impl Into<String>) -> TimelineError {
    TimelineError::ExpressionRuntime {
        message: message.into(),
    }
}

impl<'a, 'c> Evaluator<'a, 'c> {
    pub fn new(ctx: &'a ExpressionContext<'c>) -> Self {
        Self {
            ctx,
            vars: HashMap::new(),
            steps: 0,
            depth: 0,
        }
    }

    pub fn run(&mut self, program: &Program) -> Result<ExprValue, TimelineError> {
        let mut result = ExprValue::Num(0.0);
        for stmt in &program.stmts {
            match stmt {
                Stmt::Assign { name, expr } => {
                    let value = self.eval(expr)?;
                    self.vars.insert(name.clone(), value.clone());
                    result = value;
                }
                Stmt::Expr(expr) => {
                    result = self.eval(expr)?;
                }
            }
        }
        Ok(result)
    }

    fn tick(&mut self) -> Result<(), TimelineError> {
        self.steps += 1;
        if self.steps > STEP_BUDGET {
            return Err(TimelineError::ExpressionBudgetExceeded {
                budget: STEP_BUDGET,
            });
        }
        Ok(())
    }

    // Evaluation recurses once per tree level, so nesting is capped at
    // MAX_DEPTH to keep hostile formulas off the call stack limit.
    fn eval(&mut self, expr: &Expr) -> Result<ExprValue, TimelineError> {
        self.tick()?;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.depth -= 1;
            return Err(runtime("expression nested too deeply"));
        }
        let result = self.eval_node(expr);
        self.depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr) -> Result<ExprValue, TimelineError> {
        match expr {
            Expr::Num(n) => Ok(ExprValue::Num(*n)),
            Expr::Str(s) => Ok(ExprValue::Str(s.clone())),
            Expr::Ident { name, pos } => self.lookup(name, *pos),
            Expr::Array(items) => {
                let mut components = Vec::with_capacity(items.len());
                for item in items {
                    components.push(self.eval_num(item)?);
                }
                Ok(ExprValue::Vec(components))
            }
            Expr::Unary { op, expr } => {
                let value = self.eval(expr)?;
                match op {
                    UnaryOp::Neg => match value {
                        ExprValue::Num(n) => Ok(ExprValue::Num(-n)),
                        ExprValue::Vec(v) => Ok(ExprValue::Vec(v.iter().map(|x| -x).collect())),
                        other => Err(runtime(format!("cannot negate {}", other.type_name()))),
                    },
                    UnaryOp::Not => Ok(ExprValue::Bool(!value.truthy())),
                }
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call { name, args, pos } => self.eval_call(name, args, *pos),
            Expr::Member { object, name, pos } => {
                let object = self.eval(object)?;
                self.eval_member(object, name, *pos)
            }
            Expr::MethodCall {
                object,
                name,
                args,
                pos,
            } => {
                let object = self.eval(object)?;
                self.eval_method(object, name, args, *pos)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval_num(index)?;
                match object {
                    ExprValue::Vec(v) => {
                        let i = index as usize;
                        v.get(i)
                            .copied()
                            .map(ExprValue::Num)
                            .ok_or_else(|| runtime(format!("index {i} out of bounds")))
                    }
                    other => Err(runtime(format!("cannot index {}", other.type_name()))),
                }
            }
        }
    }

    fn eval_num(&mut self, expr: &Expr) -> Result<f64, TimelineError> {
        match self.eval(expr)? {
            ExprValue::Num(n) => Ok(n),
            ExprValue::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
            other => Err(runtime(format!("expected number, got {}", other.type_name()))),
        }
    }

    fn lookup(&mut self, name: &str, pos: Pos) -> Result<ExprValue, TimelineError> {
        if let Some(value) = self.vars.get(name) {
            return Ok(value.clone());
        }
        let ctx = self.ctx;
        let value = match name {
            "time" => ExprValue::Num(ctx.time),
            "frame" => ExprValue::Num(ctx.frame),
            "fps" => ExprValue::Num(ctx.fps),
            "duration" => ExprValue::Num(ctx.duration),
            "value" => ExprValue::from_property(&ctx.value)
                .ok_or_else(|| runtime("property value has no expression shape"))?,
            "velocity" => ExprValue::from_property(&ctx.velocity)
                .ok_or_else(|| runtime("property velocity has no expression shape"))?,
            "numKeys" => ExprValue::Num(ctx.keyframes.len() as f64),
            "name" => ExprValue::Str(ctx.property_name.clone()),
            "textIndex" => ExprValue::Num(
                ctx.selector
                    .ok_or_else(|| runtime("textIndex is only bound inside selectors"))?
                    .text_index as f64,
            ),
            "textTotal" => ExprValue::Num(
                ctx.selector
                    .ok_or_else(|| runtime("textTotal is only bound inside selectors"))?
                    .text_total as f64,
            ),
            "selectorValue" => ExprValue::Num(
                ctx.selector
                    .ok_or_else(|| runtime("selectorValue is only bound inside selectors"))?
                    .selector_value,
            ),
            "PI" => ExprValue::Num(std::f64::consts::PI),
            "E" => ExprValue::Num(std::f64::consts::E),
            _ => {
                return Err(runtime(format!(
                    "unknown identifier '{name}' at {}:{}",
                    pos.line, pos.column
                )))
            }
        };
        Ok(value)
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<ExprValue, TimelineError> {
        // Short-circuit logic first.
        match op {
            BinaryOp::And => {
                let l = self.eval(lhs)?;
                if !l.truthy() {
                    return Ok(ExprValue::Bool(false));
                }
                let r = self.eval(rhs)?;
                return Ok(ExprValue::Bool(r.truthy()));
            }
            BinaryOp::Or => {
                let l = self.eval(lhs)?;
                if l.truthy() {
                    return Ok(ExprValue::Bool(true));
                }
                let r = self.eval(rhs)?;
                return Ok(ExprValue::Bool(r.truthy()));
            }
            _ => {}
        }

        let l = self.eval(lhs)?;
        let r = self.eval(rhs)?;
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                arithmetic(op, l, r)
            }
            BinaryOp::Eq => Ok(ExprValue::Bool(values_equal(&l, &r))),
            BinaryOp::Ne => Ok(ExprValue::Bool(!values_equal(&l, &r))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (a, b) = match (&l, &r) {
                    (ExprValue::Num(a), ExprValue::Num(b)) => (*a, *b),
                    _ => {
                        return Err(runtime(format!(
                            "cannot compare {} with {}",
                            l.type_name(),
                            r.type_name()
                        )))
                    }
                };
                let result = match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::Le => a <= b,
                    BinaryOp::Gt => a > b,
                    BinaryOp::Ge => a >= b,
                    _ => unreachable!(),
                };
                Ok(ExprValue::Bool(result))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!(),
        }
    }

    fn eval_member(
        &mut self,
        object: ExprValue,
        name: &str,
        pos: Pos,
    ) -> Result<ExprValue, TimelineError> {
        match object {
            ExprValue::Vec(v) => {
                let index = match name {
                    "x" | "r" => 0,
                    "y" | "g" => 1,
                    "z" | "b" => 2,
                    _ => {
                        return Err(runtime(format!(
                            "unknown vector member '{name}' at {}:{}",
                            pos.line, pos.column
                        )))
                    }
                };
                v.get(index)
                    .copied()
                    .map(ExprValue::Num)
                    .ok_or_else(|| runtime(format!("vector has no component '{name}'")))
            }
            ExprValue::Key {
                index,
                frame,
                value,
            } => match name {
                "index" => Ok(ExprValue::Num(index as f64)),
                "frame" => Ok(ExprValue::Num(frame)),
                "time" => Ok(ExprValue::Num(frame / self.ctx.fps)),
                "value" => Ok(*value),
                _ => Err(runtime(format!("unknown keyframe member '{name}'"))),
            },
            ExprValue::Layer(layer) => match name {
                "name" => Ok(ExprValue::Str(layer.name)),
                "index" => Ok(ExprValue::Num(layer.index as f64)),
                "opacity" => Ok(ExprValue::Num(layer.opacity)),
                "position" => Ok(ExprValue::Vec(layer.transform.position.to_vec())),
                "anchor" => Ok(ExprValue::Vec(layer.transform.anchor.to_vec())),
                "scale" => Ok(ExprValue::Vec(layer.transform.scale.to_vec())),
                "rotation" => Ok(ExprValue::Vec(layer.transform.rotation.to_vec())),
                _ => Err(runtime(format!("unknown layer member '{name}'"))),
            },
            other => Err(runtime(format!(
                "{} has no member '{name}'",
                other.type_name()
            ))),
        }
    }

    fn eval_method(
        &mut self,
        object: ExprValue,
        name: &str,
        args: &[Expr],
        _pos: Pos,
    ) -> Result<ExprValue, TimelineError> {
        match (object, name) {
            (ExprValue::Layer(layer), "effect") => {
                if args.len() != 2 {
                    return Err(runtime("effect(effectName, paramName) takes two arguments"));
                }
                let effect = self.eval_str(&args[0])?;
                let param = self.eval_str(&args[1])?;
                let resolver = self
                    .ctx
                    .resolver
                    .ok_or_else(|| runtime("no layer resolver available"))?;
                let value = resolver
                    .effect_value(&layer.name, &effect, &param)
                    .ok_or_else(|| {
                        runtime(format!("effect '{effect}.{param}' not found on '{}'", layer.name))
                    })?;
                ExprValue::from_property(&value)
                    .ok_or_else(|| runtime("effect value has no expression shape"))
            }
            (object, _) => Err(runtime(format!(
                "{} has no method '{name}'",
                object.type_name()
            ))),
        }
    }

    fn eval_str(&mut self, expr: &Expr) -> Result<String, TimelineError> {
        match self.eval(expr)? {
            ExprValue::Str(s) => Ok(s),
            other => Err(runtime(format!("expected string, got {}", other.type_name()))),
        }
    }

    fn key_value(&self, kf: &Keyframe, index: usize) -> Result<ExprValue, TimelineError> {
        let value = ExprValue::from_property(&kf.value)
            .ok_or_else(|| runtime("keyframe value has no expression shape"))?;
        Ok(ExprValue::Key {
            index,
            frame: kf.frame as f64,
            value: Box::new(value),
        })
    }

    fn eval_call(
        &mut self,
        name: &str,
        args: &[Expr],
        pos: Pos,
    ) -> Result<ExprValue, TimelineError> {
        // Unary math helpers share an arity-1 path.
        if let Some(f) = unary_math(name) {
            if args.len() != 1 {
                return Err(runtime(format!("{name}() takes one argument")));
            }
            return match self.eval(&args[0])? {
                ExprValue::Num(n) => Ok(ExprValue::Num(f(n))),
                ExprValue::Vec(v) => Ok(ExprValue::Vec(v.into_iter().map(f).collect())),
                other => Err(runtime(format!(
                    "{name}() expects a number, got {}",
                    other.type_name()
                ))),
            };
        }

        match name {
            "pow" | "atan2" => {
                if args.len() != 2 {
                    return Err(runtime(format!("{name}() takes two arguments")));
                }
                let a = self.eval_num(&args[0])?;
                let b = self.eval_num(&args[1])?;
                Ok(ExprValue::Num(if name == "pow" {
                    a.powf(b)
                } else {
                    a.atan2(b)
                }))
            }
            "min" | "max" => {
                if args.len() != 2 {
                    return Err(runtime(format!("{name}() takes two arguments")));
                }
                let a = self.eval(&args[0])?;
                let b = self.eval(&args[1])?;
                let pick = |x: f64, y: f64| if name == "min" { x.min(y) } else { x.max(y) };
                match (a, b) {
                    (ExprValue::Num(a), ExprValue::Num(b)) => Ok(ExprValue::Num(pick(a, b))),
                    (ExprValue::Vec(a), ExprValue::Vec(b)) => Ok(ExprValue::Vec(
                        a.iter().zip(b.iter()).map(|(&x, &y)| pick(x, y)).collect(),
                    )),
                    (a, b) => Err(runtime(format!(
                        "{name}() expects matching shapes, got {} and {}",
                        a.type_name(),
                        b.type_name()
                    ))),
                }
            }
            "clamp" => {
                if args.len() != 3 {
                    return Err(runtime("clamp(x, lo, hi) takes three arguments"));
                }
                let lo = self.eval_num(&args[1])?;
                let hi = self.eval_num(&args[2])?;
                match self.eval(&args[0])? {
                    ExprValue::Num(x) => Ok(ExprValue::Num(x.clamp(lo, hi))),
                    ExprValue::Vec(v) => {
                        Ok(ExprValue::Vec(v.into_iter().map(|x| x.clamp(lo, hi)).collect()))
                    }
                    other => Err(runtime(format!(
                        "clamp() expects a number or vector, got {}",
                        other.type_name()
                    ))),
                }
            }
            "linear" => {
                // linear(t, tMin, tMax, v1, v2): remap with clamping.
                if args.len() != 5 {
                    return Err(runtime("linear(t, tMin, tMax, v1, v2) takes five arguments"));
                }
                let t = self.eval_num(&args[0])?;
                let t0 = self.eval_num(&args[1])?;
                let t1 = self.eval_num(&args[2])?;
                let v0 = self.eval(&args[3])?;
                let v1 = self.eval(&args[4])?;
                let u = if (t1 - t0).abs() < f64::EPSILON {
                    0.0
                } else {
                    ((t - t0) / (t1 - t0)).clamp(0.0, 1.0)
                };
                arithmetic(
                    BinaryOp::Add,
                    v0.clone(),
                    arithmetic(
                        BinaryOp::Mul,
                        arithmetic(BinaryOp::Sub, v1, v0)?,
                        ExprValue::Num(u),
                    )?,
                )
            }
            "add" | "sub" | "mul" | "div" => {
                if args.len() != 2 {
                    return Err(runtime(format!("{name}() takes two arguments")));
                }
                let a = self.eval(&args[0])?;
                let b = self.eval(&args[1])?;
                let op = match name {
                    "add" => BinaryOp::Add,
                    "sub" => BinaryOp::Sub,
                    "mul" => BinaryOp::Mul,
                    _ => BinaryOp::Div,
                };
                arithmetic(op, a, b)
            }
            "dot" => {
                let (a, b) = self.two_vecs(name, args)?;
                Ok(ExprValue::Num(
                    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
                ))
            }
            "cross" => {
                let (a, b) = self.two_vecs(name, args)?;
                if a.len() < 3 || b.len() < 3 {
                    // 2D cross product: scalar z component.
                    if a.len() >= 2 && b.len() >= 2 {
                        return Ok(ExprValue::Num(a[0] * b[1] - a[1] * b[0]));
                    }
                    return Err(runtime("cross() expects 2- or 3-component vectors"));
                }
                Ok(ExprValue::Vec(vec![
                    a[1] * b[2] - a[2] * b[1],
                    a[2] * b[0] - a[0] * b[2],
                    a[0] * b[1] - a[1] * b[0],
                ]))
            }
            "length" => match args.len() {
                1 => {
                    let v = self.eval_vec(&args[0])?;
                    Ok(ExprValue::Num(v.iter().map(|x| x * x).sum::<f64>().sqrt()))
                }
                2 => {
                    let a = self.eval_vec(&args[0])?;
                    let b = self.eval_vec(&args[1])?;
                    if a.len() != b.len() {
                        return Err(runtime("length(a, b) expects matching vector lengths"));
                    }
                    Ok(ExprValue::Num(
                        a.iter()
                            .zip(b.iter())
                            .map(|(x, y)| (x - y) * (x - y))
                            .sum::<f64>()
                            .sqrt(),
                    ))
                }
                _ => Err(runtime("length() takes one or two arguments")),
            },
            "normalize" => {
                let arg = args
                    .first()
                    .ok_or_else(|| runtime("normalize(v) takes one argument"))?;
                let v = self.eval_vec(arg)?;
                let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm < f64::EPSILON {
                    return Ok(ExprValue::Vec(vec![0.0; v.len()]));
                }
                Ok(ExprValue::Vec(v.into_iter().map(|x| x / norm).collect()))
            }
            "degreesToRadians" => {
                let n = self.eval_num(args.first().ok_or_else(|| runtime("missing argument"))?)?;
                Ok(ExprValue::Num(n.to_radians()))
            }
            "radiansToDegrees" => {
                let n = self.eval_num(args.first().ok_or_else(|| runtime("missing argument"))?)?;
                Ok(ExprValue::Num(n.to_degrees()))
            }
            "key" => {
                if args.len() != 1 {
                    return Err(runtime("key(n) takes one argument"));
                }
                let n = self.eval_num(&args[0])?;
                if n < 1.0 {
                    return Err(runtime("key(n) is 1-based"));
                }
                let index = (n as usize) - 1;
                let kf = self
                    .ctx
                    .keyframes
                    .get(index)
                    .ok_or_else(|| runtime(format!("key({n}) out of range")))?;
                self.key_value(kf, index + 1)
            }
            "nearestKey" => {
                if args.len() != 1 {
                    return Err(runtime("nearestKey(frame) takes one argument"));
                }
                let target = self.eval_num(&args[0])?;
                let (index, kf) = self
                    .ctx
                    .keyframes
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        let da = (a.frame as f64 - target).abs();
                        let db = (b.frame as f64 - target).abs();
                        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .ok_or_else(|| runtime("property has no keyframes"))?;
                self.key_value(kf, index + 1)
            }
            "random" => {
                let seed = match args.len() {
                    0 => {
                        // No explicit seed: derive one from the evaluation
                        // coordinates so results stay frame-deterministic.
                        let name_salt = self
                            .ctx
                            .property_name
                            .bytes()
                            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
                        return Ok(ExprValue::Num(noise::random01_pair(
                            self.ctx.frame,
                            name_salt,
                        )));
                    }
                    1 => self.eval_num(&args[0])?,
                    _ => return Err(runtime("random([seed]) takes at most one argument")),
                };
                Ok(ExprValue::Num(noise::random01(seed)))
            }
            "noise" => {
                if args.len() != 1 {
                    return Err(runtime("noise(x) takes one argument"));
                }
                let x = self.eval_num(&args[0])?;
                Ok(ExprValue::Num(noise::value_noise(x, 0)))
            }
            "wiggle" => self.eval_wiggle(args),
            "loopIn" => self.eval_loop(args, true),
            "loopOut" => self.eval_loop(args, false),
            "toComp" | "fromComp" | "toWorld" | "fromWorld" => self.eval_space(name, args),
            "pathPoint" | "pathTangent" => {
                if args.len() != 1 {
                    return Err(runtime(format!("{name}(t) takes one argument")));
                }
                let t = self.eval_num(&args[0])?;
                let layer = self
                    .ctx
                    .layer
                    .as_ref()
                    .ok_or_else(|| runtime("no layer bound for path sampling"))?;
                let sampler = self
                    .ctx
                    .spline
                    .ok_or_else(|| runtime("no spline sampler available"))?;
                let sample = sampler
                    .sample(layer.id, t, self.ctx.frame)
                    .ok_or_else(|| runtime("spline sample unavailable"))?;
                let p = if name == "pathPoint" {
                    sample.point
                } else {
                    sample.tangent
                };
                Ok(ExprValue::Vec(p.to_vec()))
            }
            "layer" => {
                if args.len() != 1 {
                    return Err(runtime("layer(nameOrIndex) takes one argument"));
                }
                let resolver = self
                    .ctx
                    .resolver
                    .ok_or_else(|| runtime("no layer resolver available"))?;
                let snapshot = match self.eval(&args[0])? {
                    ExprValue::Str(name) => resolver.layer_by_name(&name),
                    ExprValue::Num(index) => resolver.layer_by_index(index as usize),
                    other => {
                        return Err(runtime(format!(
                            "layer() expects a name or index, got {}",
                            other.type_name()
                        )))
                    }
                };
                snapshot
                    .map(ExprValue::Layer)
                    .ok_or_else(|| runtime("layer not found"))
            }
            _ => Err(runtime(format!(
                "unknown function '{name}' at {}:{}",
                pos.line, pos.column
            ))),
        }
    }

    fn two_vecs(&mut self, name: &str, args: &[Expr]) -> Result<(Vec<f64>, Vec<f64>), TimelineError> {
        if args.len() != 2 {
            return Err(runtime(format!("{name}() takes two arguments")));
        }
        Ok((self.eval_vec(&args[0])?, self.eval_vec(&args[1])?))
    }

    fn eval_vec(&mut self, expr: &Expr) -> Result<Vec<f64>, TimelineError> {
        match self.eval(expr)? {
            ExprValue::Vec(v) => Ok(v),
            ExprValue::Num(n) => Ok(vec![n]),
            other => Err(runtime(format!("expected vector, got {}", other.type_name()))),
        }
    }

    /// `wiggle(freq, amp[, octaves])`: multi-octave sine noise composed from
    /// `time`, added to the current value, per component.
    fn eval_wiggle(&mut self, args: &[Expr]) -> Result<ExprValue, TimelineError> {
        if args.len() < 2 || args.len() > 3 {
            return Err(runtime("wiggle(freq, amp[, octaves]) takes two or three arguments"));
        }
        let freq = self.eval_num(&args[0])?;
        let amp = self.eval_num(&args[1])?;
        let octaves = if args.len() == 3 {
            self.eval_num(&args[2])?.max(1.0) as u32
        } else {
            1
        };
        let base = ExprValue::from_property(&self.ctx.value)
            .ok_or_else(|| runtime("property value has no expression shape"))?;
        let x = self.ctx.time * freq;
        match base {
            ExprValue::Num(n) => Ok(ExprValue::Num(n + amp * noise::fbm(x, octaves, 1))),
            ExprValue::Vec(v) => Ok(ExprValue::Vec(
                v.iter()
                    .enumerate()
                    // Distinct salt per component keeps axes independent.
                    .map(|(i, &c)| c + amp * noise::fbm(x, octaves, 1 + i as u64))
                    .collect(),
            )),
            other => Err(runtime(format!("cannot wiggle {}", other.type_name()))),
        }
    }

    /// `loopIn(mode)` / `loopOut(mode)` with cycle/pingpong/offset/continue
    /// semantics anchored to the property's own keyframe span.
    fn eval_loop(&mut self, args: &[Expr], inward: bool) -> Result<ExprValue, TimelineError> {
        let mode = if args.is_empty() {
            "cycle".to_string()
        } else {
            self.eval_str(&args[0])?
        };
        let property = match self.ctx.property {
            Some(p) => p,
            None => {
                return ExprValue::from_property(&self.ctx.value)
                    .ok_or_else(|| runtime("property value has no expression shape"))
            }
        };
        let value = crate::interp::loop_sample(
            property,
            self.ctx.frame,
            self.ctx.fps,
            &mode,
            inward,
        )
        .map_err(|e| runtime(e.to_string()))?;
        ExprValue::from_property(&value)
            .ok_or_else(|| runtime("looped value has no expression shape"))
    }

    fn eval_space(&mut self, name: &str, args: &[Expr]) -> Result<ExprValue, TimelineError> {
        if args.len() != 1 {
            return Err(runtime(format!("{name}(point) takes one argument")));
        }
        let v = self.eval_vec(&args[0])?;
        let p = [
            v.first().copied().unwrap_or(0.0),
            v.get(1).copied().unwrap_or(0.0),
            v.get(2).copied().unwrap_or(0.0),
        ];
        let to_comp = self.ctx.to_comp_matrix();
        let comp_to_world = self.ctx.comp_to_world_matrix();
        let invert = |m: nalgebra::Matrix4<f64>| {
            m.try_inverse()
                .ok_or_else(|| runtime("transform is not invertible"))
        };
        let out = match name {
            "toComp" => transform_point(&to_comp, p),
            "fromComp" => transform_point(&invert(to_comp)?, p),
            "toWorld" => transform_point(&(comp_to_world * to_comp), p),
            "fromWorld" => transform_point(&invert(comp_to_world * to_comp)?, p),
            _ => unreachable!(),
        };
        // Preserve the caller's dimensionality.
        Ok(ExprValue::Vec(out[..v.len().clamp(2, 3)].to_vec()))
    }
}

fn unary_math(name: &str) -> Option<fn(f64) -> f64> {
    Some(match name {
        "abs" => f64::abs,
        "floor" => f64::floor,
        "ceil" => f64::ceil,
        "round" => f64::round,
        "sqrt" => f64::sqrt,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "asin" => f64::asin,
        "acos" => f64::acos,
        "atan" => f64::atan,
        "exp" => f64::exp,
        "log" => f64::ln,
        _ => return None,
    })
}

fn values_equal(a: &ExprValue, b: &ExprValue) -> bool {
    match (a, b) {
        (ExprValue::Num(a), ExprValue::Num(b)) => a == b,
        (ExprValue::Bool(a), ExprValue::Bool(b)) => a == b,
        (ExprValue::Str(a), ExprValue::Str(b)) => a == b,
        (ExprValue::Vec(a), ExprValue::Vec(b)) => a == b,
        _ => false,
    }
}

/// Component arithmetic with scalar broadcast.
fn arithmetic(op: BinaryOp, l: ExprValue, r: ExprValue) -> Result<ExprValue, TimelineError> {
    let apply = |a: f64, b: f64| -> f64 {
        match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a.rem_euclid(b),
            _ => unreachable!(),
        }
    };
    match (l, r) {
        (ExprValue::Num(a), ExprValue::Num(b)) => Ok(ExprValue::Num(apply(a, b))),
        (ExprValue::Vec(a), ExprValue::Num(b)) => {
            Ok(ExprValue::Vec(a.into_iter().map(|x| apply(x, b)).collect()))
        }
        (ExprValue::Num(a), ExprValue::Vec(b)) => {
            Ok(ExprValue::Vec(b.into_iter().map(|x| apply(a, x)).collect()))
        }
        (ExprValue::Vec(a), ExprValue::Vec(b)) => {
            if a.len() != b.len() {
                return Err(runtime(format!(
                    "vector length mismatch ({} vs {})",
                    a.len(),
                    b.len()
                )));
            }
            Ok(ExprValue::Vec(
                a.into_iter().zip(b).map(|(x, y)| apply(x, y)).collect(),
            ))
        }
        (l, r) => Err(runtime(format!(
            "cannot combine {} with {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}
