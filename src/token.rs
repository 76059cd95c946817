use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Var,
    If,
    Else,
    While,
    Break,
    Fn,
    Return,

    // Literals and identifiers
    Ident(String),
    Integer(BigInt),
    Decimal(BigDecimal),
    True,
    False,

    // Arithmetic operators (Inc/Dec are reserved: lexed, never parsed)
    Plus,
    Minus,
    Star,
    Slash,
    Inc,
    Dec,

    // Comparison operators
    Eq,
    NotEq,
    Greater,
    Less,
    GreaterEq,
    LessEq,

    // Logical operators
    And,
    Or,
    Bang,

    // Assignment
    Assign,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Comma,

    // Anything the lexer could not classify; reported by the parser
    Unknown(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Var => write!(f, "var"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Break => write!(f, "break"),
            Token::Fn => write!(f, "fn"),
            Token::Return => write!(f, "return"),
            Token::Ident(name) => write!(f, "identifier `{}`", name),
            Token::Integer(value) => write!(f, "integer `{}`", value),
            Token::Decimal(value) => write!(f, "decimal `{}`", value),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Inc => write!(f, "++"),
            Token::Dec => write!(f, "--"),
            Token::Eq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Greater => write!(f, ">"),
            Token::Less => write!(f, "<"),
            Token::GreaterEq => write!(f, ">="),
            Token::LessEq => write!(f, "<="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Assign => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Unknown(ch) => write!(f, "unknown character `{}`", ch),
        }
    }
}
