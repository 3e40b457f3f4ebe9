//! Arithmetic evaluator for `${eval:'...'}` template expressions.
//!
//! Numeric semantics follow the templating language the configs are written
//! in: `/` always yields a float, `//` is floor division, `%` is a
//! floored remainder. Bare dotted identifiers are resolved through the
//! lookup callback.

use anyhow::{bail, Context, Result};
use serde_yaml::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::from(i),
            Num::Float(f) => Value::from(f),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

pub fn eval(input: &str, lookup: &mut dyn FnMut(&str) -> Result<Num>) -> Result<Num> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0, lookup };
    let value = parser.expr()?;
    parser.expect_end()?;
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Num),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '/' => {
                if bytes.get(i + 1) == Some(&b'/') {
                    tokens.push(Token::SlashSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '0'..='9' | '.' => {
                let start = i;
                let mut is_float = false;
                while i < bytes.len() {
                    match bytes[i] as char {
                        '0'..='9' => i += 1,
                        '.' => {
                            is_float = true;
                            i += 1;
                        }
                        'e' | 'E' => {
                            is_float = true;
                            i += 1;
                            if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
                let text = &input[start..i];
                let num = if is_float {
                    Num::Float(
                        text.parse::<f64>()
                            .with_context(|| format!("bad number `{text}` in eval expression"))?,
                    )
                } else {
                    Num::Int(
                        text.parse::<i64>()
                            .with_context(|| format!("bad number `{text}` in eval expression"))?,
                    )
                };
                tokens.push(Token::Num(num));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i] as char, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(input[start..i].to_string()));
            }
            other => bail!("unexpected character `{other}` in eval expression `{input}`"),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    lookup: &'a mut dyn FnMut(&str) -> Result<Num>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos != self.tokens.len() {
            bail!("trailing tokens in eval expression");
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Num> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek() {
            let op = match op {
                Token::Plus => Op::Add,
                Token::Minus => Op::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Num> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek() {
            let op = match op {
                Token::Star => Op::Mul,
                Token::Slash => Op::Div,
                Token::SlashSlash => Op::FloorDiv,
                Token::Percent => Op::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Num> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.pos += 1;
            return Ok(match self.unary()? {
                Num::Int(i) => Num::Int(
                    i.checked_neg()
                        .context("integer overflow in eval expression")?,
                ),
                Num::Float(f) => Num::Float(-f),
            });
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Num> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::Ident(path)) => (self.lookup)(&path),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => bail!("missing `)` in eval expression"),
                }
            }
            other => bail!("unexpected token {:?} in eval expression", other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
}

fn apply(op: Op, a: Num, b: Num) -> Result<Num> {
    use Num::*;
    let overflow = || anyhow::anyhow!("integer overflow in eval expression");
    Ok(match (op, a, b) {
        (Op::Add, Int(a), Int(b)) => Int(a.checked_add(b).ok_or_else(overflow)?),
        (Op::Add, a, b) => Float(a.as_f64() + b.as_f64()),
        (Op::Sub, Int(a), Int(b)) => Int(a.checked_sub(b).ok_or_else(overflow)?),
        (Op::Sub, a, b) => Float(a.as_f64() - b.as_f64()),
        (Op::Mul, Int(a), Int(b)) => Int(a.checked_mul(b).ok_or_else(overflow)?),
        (Op::Mul, a, b) => Float(a.as_f64() * b.as_f64()),
        // True division always produces a float.
        (Op::Div, a, b) => {
            if b.as_f64() == 0.0 {
                bail!("division by zero in eval expression");
            }
            Float(a.as_f64() / b.as_f64())
        }
        (Op::FloorDiv, Int(a), Int(b)) => {
            if b == 0 {
                bail!("division by zero in eval expression");
            }
            Int(a.div_euclid(b))
        }
        (Op::FloorDiv, a, b) => {
            if b.as_f64() == 0.0 {
                bail!("division by zero in eval expression");
            }
            Float((a.as_f64() / b.as_f64()).floor())
        }
        (Op::Rem, Int(a), Int(b)) => {
            if b == 0 {
                bail!("modulo by zero in eval expression");
            }
            Int(a.rem_euclid(b))
        }
        (Op::Rem, a, b) => {
            if b.as_f64() == 0.0 {
                bail!("modulo by zero in eval expression");
            }
            Float(a.as_f64().rem_euclid(b.as_f64()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_no_idents(input: &str) -> Result<Num> {
        eval(input, &mut |path| {
            bail!("unexpected identifier `{path}`");
        })
    }

    #[test]
    fn precedence_and_parens() {
        assert_eq!(eval_no_idents("1 + 2 * 3").unwrap(), Num::Int(7));
        assert_eq!(eval_no_idents("(1 + 2) * 3").unwrap(), Num::Int(9));
    }

    #[test]
    fn floor_division_is_integral() {
        assert_eq!(eval_no_idents("10000 // 100").unwrap(), Num::Int(100));
        assert_eq!(eval_no_idents("7 // 2").unwrap(), Num::Int(3));
        assert_eq!(eval_no_idents("-7 // 2").unwrap(), Num::Int(-4));
    }

    #[test]
    fn true_division_is_float() {
        assert_eq!(eval_no_idents("10 / 4").unwrap(), Num::Float(2.5));
        assert_eq!(eval_no_idents("10 / 5").unwrap(), Num::Float(2.0));
    }

    #[test]
    fn unary_minus_and_modulo() {
        assert_eq!(eval_no_idents("-3 + 5").unwrap(), Num::Int(2));
        assert_eq!(eval_no_idents("-7 % 3").unwrap(), Num::Int(2));
    }

    #[test]
    fn identifiers_go_through_lookup() {
        let result = eval("n_timesteps // 100", &mut |path| {
            assert_eq!(path, "n_timesteps");
            Ok(Num::Int(10_000))
        })
        .unwrap();
        assert_eq!(result, Num::Int(100));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(eval_no_idents("1 / 0").is_err());
        assert!(eval_no_idents("1 // 0").is_err());
        assert!(eval_no_idents("1 % 0").is_err());
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(eval_no_idents("1 2").is_err());
        assert!(eval_no_idents("(1").is_err());
    }
}
