//! Recursive-descent parser producing the expression AST.

use super::ast::{BinaryOp, Expr, Pos, Program, Stmt, UnaryOp, MAX_DEPTH};
use super::lexer::{tokenize, SpannedToken, Token};
use crate::error::TimelineError;

pub fn parse(source: &str) -> Result<Program, TimelineError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.program()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn current_pos(&self) -> Pos {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.pos)
            .unwrap_or(Pos { line: 1, column: 1 })
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> TimelineError {
        let pos = self.current_pos();
        TimelineError::ExpressionParse {
            line: pos.line,
            column: pos.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), TimelineError> {
        match self.peek() {
            Some(t) if *t == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(t) => Err(self.error(format!("expected {what}, found {t:?}"))),
            None => Err(self.error(format!("expected {what}, found end of input"))),
        }
    }

    fn program(&mut self) -> Result<Program, TimelineError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.statement()?);
            // Statements are semicolon-separated; a trailing semicolon is fine.
            while self.peek() == Some(&Token::Semi) {
                self.pos += 1;
            }
        }
        if stmts.is_empty() {
            return Err(self.error("empty expression"));
        }
        Ok(Program { stmts })
    }

    fn statement(&mut self) -> Result<Stmt, TimelineError> {
        if let (Some(Token::Ident(name)), Some(Token::Assign)) = (self.peek(), self.peek_at(1)) {
            let name = name.clone();
            self.pos += 2;
            let expr = self.expression()?;
            return Ok(Stmt::Assign { name, expr });
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    // Grouping, ternaries and argument lists re-enter here, so the nesting
    // cap lives on this rule (and on `unary` for bare `--...-x` chains).
    fn expression(&mut self) -> Result<Expr, TimelineError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.depth -= 1;
            return Err(self.error("expression nested too deeply"));
        }
        let result = self.ternary();
        self.depth -= 1;
        result
    }

    fn ternary(&mut self) -> Result<Expr, TimelineError> {
        let cond = self.logic_or()?;
        if self.peek() == Some(&Token::Question) {
            self.pos += 1;
            let then = self.expression()?;
            self.expect(Token::Colon, "':'")?;
            let otherwise = self.expression()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(cond)
    }

    fn logic_or(&mut self) -> Result<Expr, TimelineError> {
        let mut lhs = self.logic_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.pos += 1;
            let rhs = self.logic_and()?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn logic_and(&mut self) -> Result<Expr, TimelineError> {
        let mut lhs = self.equality()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.pos += 1;
            let rhs = self.equality()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, TimelineError> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.comparison()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, TimelineError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, TimelineError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, TimelineError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, TimelineError> {
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            self.depth += 1;
            if self.depth > MAX_DEPTH {
                self.depth -= 1;
                return Err(self.error("expression nested too deeply"));
            }
            let expr = self.unary();
            self.depth -= 1;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr?),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, TimelineError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let pos = self.current_pos();
                    let name = match self.advance() {
                        Some(Token::Ident(name)) => name,
                        _ => return Err(self.error("expected member name after '.'")),
                    };
                    if self.peek() == Some(&Token::LParen) {
                        let args = self.arguments()?;
                        expr = Expr::MethodCall {
                            object: Box::new(expr),
                            name,
                            args,
                            pos,
                        };
                    } else {
                        expr = Expr::Member {
                            object: Box::new(expr),
                            name,
                            pos,
                        };
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.expression()?;
                    self.expect(Token::RBracket, "']'")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, TimelineError> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.peek() {
                Some(Token::Comma) => {
                    self.pos += 1;
                }
                Some(Token::RParen) => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or ')' in argument list")),
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, TimelineError> {
        let pos = self.current_pos();
        match self.advance() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    let args = self.arguments()?;
                    Ok(Expr::Call { name, args, pos })
                } else {
                    Ok(Expr::Ident { name, pos })
                }
            }
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.pos += 1;
                    return Ok(Expr::Array(items));
                }
                loop {
                    items.push(self.expression()?);
                    match self.peek() {
                        Some(Token::Comma) => {
                            self.pos += 1;
                        }
                        Some(Token::RBracket) => {
                            self.pos += 1;
                            break;
                        }
                        _ => return Err(self.error("expected ',' or ']' in vector literal")),
                    }
                }
                Ok(Expr::Array(items))
            }
            Some(other) => Err(TimelineError::ExpressionParse {
                line: pos.line,
                column: pos.column,
                message: format!("unexpected token {other:?}"),
            }),
            None => Err(self.error("unexpected end of input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_precedence() {
        let program = parse("1 + 2 * 3").unwrap();
        match &program.stmts[0] {
            Stmt::Expr(Expr::Binary {
                op: BinaryOp::Add,
                rhs,
                ..
            }) => {
                assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected parse {other:?}"),
        }
    }

    #[test]
    fn test_parse_statements_and_assignment() {
        let program = parse("amp = 10; value + amp").unwrap();
        assert_eq!(program.stmts.len(), 2);
        assert!(matches!(&program.stmts[0], Stmt::Assign { name, .. } if name == "amp"));
    }

    #[test]
    fn test_parse_call_member_chain() {
        let program = parse("layer(\"glow\").position.x").unwrap();
        match &program.stmts[0] {
            Stmt::Expr(Expr::Member { name, .. }) => assert_eq!(name, "x"),
            other => panic!("unexpected parse {other:?}"),
        }
    }

    #[test]
    fn test_parse_vector_literal_and_index() {
        let program = parse("[1, 2, 3][1]").unwrap();
        assert!(matches!(&program.stmts[0], Stmt::Expr(Expr::Index { .. })));
    }

    #[test]
    fn test_parse_error_has_position() {
        let err = parse("wiggle(1,").unwrap_err();
        assert!(matches!(err, TimelineError::ExpressionParse { .. }));
    }

    #[test]
    fn test_parse_ternary() {
        let program = parse("time > 1 ? 100 : 0").unwrap();
        assert!(matches!(&program.stmts[0], Stmt::Expr(Expr::Ternary { .. })));
    }
}
