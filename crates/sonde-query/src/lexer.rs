use std::iter::Peekable;
use std::str::Chars;

use serde_json::Number;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Dot,
    At,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Pipe,
    Comma,
    Semi,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Ident(String),
    Str(String),
    Num(Number),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Dot => write!(f, "'.'"),
            Token::At => write!(f, "'@'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Pipe => write!(f, "'|'"),
            Token::Comma => write!(f, "','"),
            Token::Semi => write!(f, "';'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::Eq => write!(f, "'=='"),
            Token::Ne => write!(f, "'!='"),
            Token::Lt => write!(f, "'<'"),
            Token::Le => write!(f, "'<='"),
            Token::Gt => write!(f, "'>'"),
            Token::Ge => write!(f, "'>='"),
            Token::Ident(name) => write!(f, "identifier {name:?}"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Num(n) => write!(f, "number {n}"),
        }
    }
}

pub(crate) fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut chars = src.chars().peekable();
    let mut tokens = Vec::new();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => push1(&mut chars, &mut tokens, Token::Dot),
            '@' => push1(&mut chars, &mut tokens, Token::At),
            '[' => push1(&mut chars, &mut tokens, Token::LBracket),
            ']' => push1(&mut chars, &mut tokens, Token::RBracket),
            '(' => push1(&mut chars, &mut tokens, Token::LParen),
            ')' => push1(&mut chars, &mut tokens, Token::RParen),
            '|' => push1(&mut chars, &mut tokens, Token::Pipe),
            ',' => push1(&mut chars, &mut tokens, Token::Comma),
            ';' => push1(&mut chars, &mut tokens, Token::Semi),
            '+' => push1(&mut chars, &mut tokens, Token::Plus),
            '-' => push1(&mut chars, &mut tokens, Token::Minus),
            '*' => push1(&mut chars, &mut tokens, Token::Star),
            '/' => push1(&mut chars, &mut tokens, Token::Slash),
            '%' => push1(&mut chars, &mut tokens, Token::Percent),
            '=' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::Eq),
                    Some(c) => return Err(ParseError::UnexpectedChar(c)),
                    None => return Err(ParseError::UnexpectedEof),
                }
            }
            '!' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::Ne),
                    Some(c) => return Err(ParseError::UnexpectedChar(c)),
                    None => return Err(ParseError::UnexpectedEof),
                }
            }
            '<' => push_cmp(&mut chars, &mut tokens, Token::Lt, Token::Le),
            '>' => push_cmp(&mut chars, &mut tokens, Token::Gt, Token::Ge),
            '"' => tokens.push(lex_string(&mut chars)?),
            c if c.is_ascii_digit() => tokens.push(lex_number(&mut chars)?),
            c if c == '_' || c.is_ascii_alphabetic() => tokens.push(lex_ident(&mut chars)),
            c => return Err(ParseError::UnexpectedChar(c)),
        }
    }
    Ok(tokens)
}

fn push1(chars: &mut Peekable<Chars>, tokens: &mut Vec<Token>, token: Token) {
    chars.next();
    tokens.push(token);
}

fn push_cmp(chars: &mut Peekable<Chars>, tokens: &mut Vec<Token>, bare: Token, with_eq: Token) {
    chars.next();
    if chars.peek() == Some(&'=') {
        chars.next();
        tokens.push(with_eq);
    } else {
        tokens.push(bare);
    }
}

fn lex_string(chars: &mut Peekable<Chars>) -> Result<Token, ParseError> {
    chars.next(); // opening quote
    let mut s = String::new();
    loop {
        match chars.next() {
            None => return Err(ParseError::UnterminatedString),
            Some('"') => return Ok(Token::Str(s)),
            Some('\\') => match chars.next() {
                None => return Err(ParseError::UnterminatedString),
                Some('"') => s.push('"'),
                Some('\\') => s.push('\\'),
                Some('/') => s.push('/'),
                Some('n') => s.push('\n'),
                Some('t') => s.push('\t'),
                Some('r') => s.push('\r'),
                Some(c) => return Err(ParseError::InvalidEscape(c)),
            },
            Some(c) => s.push(c),
        }
    }
}

fn lex_number(chars: &mut Peekable<Chars>) -> Result<Token, ParseError> {
    let mut raw = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            raw.push(c);
            chars.next();
        } else if c == 'e' || c == 'E' {
            raw.push(c);
            chars.next();
            if let Some(&sign) = chars.peek()
                && (sign == '+' || sign == '-')
            {
                raw.push(sign);
                chars.next();
            }
        } else {
            break;
        }
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Token::Num(Number::from(i)));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Token::Num)
        .ok_or(ParseError::InvalidNumber(raw))
}

fn lex_ident(chars: &mut Peekable<Chars>) -> Token {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c == '_' || c.is_ascii_alphanumeric() {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    Token::Ident(name)
}
