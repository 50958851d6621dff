use std::iter::Peekable;
use std::vec::IntoIter;

use serde_json::Value;

use crate::error::ParseError;
use crate::lexer::{Token, lex};

/// Binary operators, lowest-to-highest precedence handled in the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub(crate) fn name(self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ast {
    /// `.` or `@`: the current input value.
    Identity,
    Literal(Value),
    /// `base.field`
    Field(Box<Ast>, String),
    /// `base[index]` with a numeric or string index expression.
    Index(Box<Ast>, Box<Ast>),
    /// `base[]`: emit every element (array) or value (object).
    Iterate(Box<Ast>),
    /// `lhs | rhs`: feed each lhs output through rhs.
    Pipe(Box<Ast>, Box<Ast>),
    /// `lhs, rhs`: concatenate both output streams.
    Concat(Box<Ast>, Box<Ast>),
    Neg(Box<Ast>),
    Binary(BinOp, Box<Ast>, Box<Ast>),
    /// Function call; bare identifiers are zero-argument calls.
    Call(String, Vec<Ast>),
}

pub(crate) fn parse(src: &str) -> Result<Ast, ParseError> {
    let mut parser = Parser {
        tokens: lex(src)?.into_iter().peekable(),
    };
    let ast = parser.pipe()?;
    match parser.tokens.next() {
        None => Ok(ast),
        Some(token) => Err(ParseError::UnexpectedToken(token.to_string())),
    }
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    fn pipe(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.concat()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.concat()?;
            lhs = Ast::Pipe(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn concat(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.compare()?;
        while self.eat(&Token::Comma) {
            let rhs = self.compare()?;
            lhs = Ast::Concat(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Comparisons are non-associative: `a < b < c` is a syntax error.
    fn compare(&mut self) -> Result<Ast, ParseError> {
        let lhs = self.additive()?;
        let op = match self.tokens.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.tokens.next();
        let rhs = self.additive()?;
        Ok(Ast::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn additive(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.tokens.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.tokens.next();
            let rhs = self.multiplicative()?;
            lhs = Ast::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.tokens.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.tokens.next();
            let rhs = self.unary()?;
            lhs = Ast::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Ast, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Ast::Neg(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Ast, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.tokens.peek() {
                Some(Token::Dot) => {
                    self.tokens.next();
                    let name = self.ident()?;
                    expr = Ast::Field(Box::new(expr), name);
                }
                Some(Token::LBracket) => {
                    self.tokens.next();
                    if self.eat(&Token::RBracket) {
                        expr = Ast::Iterate(Box::new(expr));
                    } else {
                        let index = self.pipe()?;
                        self.expect(Token::RBracket)?;
                        expr = Ast::Index(Box::new(expr), Box::new(index));
                    }
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Ast, ParseError> {
        match self.tokens.next() {
            // `.name` starts a path from the input; a lone `.` (or a `.` in
            // front of `[..]`) is the input itself.
            Some(Token::Dot) => match self.tokens.peek() {
                Some(Token::Ident(_)) => {
                    let name = self.ident()?;
                    Ok(Ast::Field(Box::new(Ast::Identity), name))
                }
                _ => Ok(Ast::Identity),
            },
            Some(Token::At) => Ok(Ast::Identity),
            Some(Token::Str(s)) => Ok(Ast::Literal(Value::String(s))),
            Some(Token::Num(n)) => Ok(Ast::Literal(Value::Number(n))),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Ast::Literal(Value::Bool(true))),
                "false" => Ok(Ast::Literal(Value::Bool(false))),
                "null" => Ok(Ast::Literal(Value::Null)),
                _ => {
                    let args = if self.eat(&Token::LParen) {
                        let mut args = vec![self.pipe()?];
                        while self.eat(&Token::Semi) {
                            args.push(self.pipe()?);
                        }
                        self.expect(Token::RParen)?;
                        args
                    } else {
                        Vec::new()
                    };
                    Ok(Ast::Call(name, args))
                }
            },
            Some(Token::LParen) => {
                let inner = self.pipe()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(ParseError::UnexpectedToken(token.to_string())),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.tokens.next() {
            Some(Token::Ident(name)) => Ok(name),
            Some(token) => Err(ParseError::UnexpectedToken(token.to_string())),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.tokens.peek() == Some(token) {
            self.tokens.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        match self.tokens.next() {
            Some(t) if t == token => Ok(()),
            Some(t) => Err(ParseError::UnexpectedToken(t.to_string())),
            None => Err(ParseError::UnexpectedEof),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_chain() {
        let ast = parse(".peers.rx").unwrap();
        assert_eq!(
            ast,
            Ast::Field(
                Box::new(Ast::Field(Box::new(Ast::Identity), "peers".into())),
                "rx".into()
            )
        );
    }

    #[test]
    fn at_is_identity() {
        assert_eq!(parse("@.name").unwrap(), parse(".name").unwrap());
    }

    #[test]
    fn parses_iteration() {
        let ast = parse(".peers[]").unwrap();
        assert_eq!(
            ast,
            Ast::Iterate(Box::new(Ast::Field(
                Box::new(Ast::Identity),
                "peers".into()
            )))
        );
    }

    #[test]
    fn bare_word_is_call() {
        assert_eq!(parse("rx_bytes").unwrap(), Ast::Call("rx_bytes".into(), vec![]));
    }

    #[test]
    fn rejects_unclosed_bracket() {
        assert_eq!(parse(".foo["), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(matches!(parse("2abc"), Err(ParseError::UnexpectedToken(_))));
    }

    #[test]
    fn pipe_binds_loosest() {
        let ast = parse(". | .a, .b").unwrap();
        assert!(matches!(ast, Ast::Pipe(_, _)));
    }
}
