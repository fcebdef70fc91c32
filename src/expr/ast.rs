//! AST for the per-frame expression language.
//!
//! The surface is deliberately small: arithmetic, comparisons, boolean
//! logic, a ternary, vector literals, member access, indexing, calls into a
//! fixed builtin table, and simple `name = expr` statements. There is no
//! user-defined function syntax and no loop construct; iteration lives in
//! the builtins (`wiggle`, `loopIn`, ...), which keeps evaluation bounded.

/// Maximum expression nesting honored by the parser, the validator and the
/// interpreter. Deeper input is rejected as an error instead of recursing
/// toward a stack overflow.
pub(crate) const MAX_DEPTH: usize = 256;

/// Source position (1-based line and column) for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Ident {
        name: String,
        pos: Pos,
    },
    Array(Vec<Expr>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        pos: Pos,
    },
    Member {
        object: Box<Expr>,
        name: String,
        pos: Pos,
    },
    MethodCall {
        object: Box<Expr>,
        name: String,
        args: Vec<Expr>,
        pos: Pos,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
}

impl Expr {
    /// Detach every direct child into `out`, leaving leaves behind.
    fn take_children(&mut self, out: &mut Vec<Expr>) {
        let mut take = |boxed: &mut Box<Expr>| {
            out.push(std::mem::replace(boxed.as_mut(), Expr::Num(0.0)));
        };
        match self {
            Expr::Num(_) | Expr::Str(_) | Expr::Ident { .. } => {}
            Expr::Array(items) => out.append(items),
            Expr::Unary { expr, .. } => take(expr),
            Expr::Binary { lhs, rhs, .. } => {
                take(lhs);
                take(rhs);
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                take(cond);
                take(then);
                take(otherwise);
            }
            Expr::Call { args, .. } => out.append(args),
            Expr::Member { object, .. } => take(object),
            Expr::MethodCall { object, args, .. } => {
                take(object);
                out.append(args);
            }
            Expr::Index { object, index } => {
                take(object);
                take(index);
            }
        }
    }
}

// A long operator chain parses (iteratively) into a deeply left-nested
// tree; the derived drop would recurse once per level and overflow the
// stack. Draining children into a worklist keeps destruction flat.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending: Vec<Expr> = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.take_children(&mut pending);
        }
    }
}

/// One statement: either a local binding or a bare expression. The program
/// result is the value of the final statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { name: String, expr: Expr },
    Expr(Expr),
}

/// A parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
