//! Tokenizer for the expression language.

use super::ast::Pos;
use crate::error::TimelineError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    // Operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Question,
    Colon,
    Assign,
    Semi,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub pos: Pos,
}

pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, TimelineError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line: u32 = 1;
    let mut column: u32 = 1;

    macro_rules! err {
        ($($arg:tt)*) => {
            return Err(TimelineError::ExpressionParse {
                line,
                column,
                message: format!($($arg)*),
            })
        };
    }

    while let Some(&c) = chars.peek() {
        let pos = Pos { line, column };
        match c {
            '\n' => {
                chars.next();
                line += 1;
                column = 1;
            }
            c if c.is_whitespace() => {
                chars.next();
                column += 1;
            }
            '/' => {
                chars.next();
                column += 1;
                // Line comments: `// ...`
                if chars.peek() == Some(&'/') {
                    while let Some(&c) = chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        chars.next();
                        column += 1;
                    }
                } else {
                    tokens.push(SpannedToken {
                        token: Token::Slash,
                        pos,
                    });
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut text = String::new();
                let mut seen_dot = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || (c == '.' && !seen_dot) {
                        if c == '.' {
                            seen_dot = true;
                        }
                        text.push(c);
                        chars.next();
                        column += 1;
                    } else {
                        break;
                    }
                }
                // A lone '.' is member access, not a number.
                if text == "." {
                    tokens.push(SpannedToken {
                        token: Token::Dot,
                        pos,
                    });
                    continue;
                }
                match text.parse::<f64>() {
                    Ok(n) => tokens.push(SpannedToken {
                        token: Token::Num(n),
                        pos,
                    }),
                    Err(_) => err!("malformed number '{text}'"),
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        text.push(c);
                        chars.next();
                        column += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(SpannedToken {
                    token: Token::Ident(text),
                    pos,
                });
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                column += 1;
                let mut text = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    column += 1;
                    if c == quote {
                        closed = true;
                        break;
                    }
                    if c == '\n' {
                        break;
                    }
                    text.push(c);
                }
                if !closed {
                    err!("unterminated string literal");
                }
                tokens.push(SpannedToken {
                    token: Token::Str(text),
                    pos,
                });
            }
            _ => {
                chars.next();
                column += 1;
                let two = |chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
                           column: &mut u32,
                           next: char|
                 -> bool {
                    if chars.peek() == Some(&next) {
                        chars.next();
                        *column += 1;
                        true
                    } else {
                        false
                    }
                };
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '%' => Token::Percent,
                    '?' => Token::Question,
                    ':' => Token::Colon,
                    ';' => Token::Semi,
                    ',' => Token::Comma,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '!' => {
                        if two(&mut chars, &mut column, '=') {
                            Token::NotEq
                        } else {
                            Token::Bang
                        }
                    }
                    '<' => {
                        if two(&mut chars, &mut column, '=') {
                            Token::Le
                        } else {
                            Token::Lt
                        }
                    }
                    '>' => {
                        if two(&mut chars, &mut column, '=') {
                            Token::Ge
                        } else {
                            Token::Gt
                        }
                    }
                    '=' => {
                        if two(&mut chars, &mut column, '=') {
                            Token::EqEq
                        } else {
                            Token::Assign
                        }
                    }
                    '&' => {
                        if two(&mut chars, &mut column, '&') {
                            Token::AndAnd
                        } else {
                            err!("unexpected character '&'")
                        }
                    }
                    '|' => {
                        if two(&mut chars, &mut column, '|') {
                            Token::OrOr
                        } else {
                            err!("unexpected character '|'")
                        }
                    }
                    other => err!("unexpected character '{other}'"),
                };
                tokens.push(SpannedToken { token, pos });
            }
        }
    }

    Ok(tokens)
}
