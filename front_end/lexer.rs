// Lexer for the packet language.

use derive_more::Display;
use logos::Logos;
use std::ops::Range;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Logos, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum TokenKind {
    // numbers: `5`, `0x0800`, `8w5`, `16w0x800`.
    #[regex(r"[0-9]+w(0x[0-9a-fA-F]+|[0-9]+)")]
    #[regex(r"0x[0-9a-fA-F]+")]
    #[regex(r"[0-9]+")]
    Num,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Id,

    // keywords
    #[token("header")]
    Header,
    #[token("struct")]
    Struct,
    #[token("extern")]
    Extern,
    #[token("parser")]
    Parser,
    #[token("state")]
    State,
    #[token("transition")]
    Transition,
    #[token("select")]
    Select,
    #[token("control")]
    Control,
    #[token("action")]
    Action,
    #[token("table")]
    Table,
    #[token("key")]
    Key,
    #[token("actions")]
    Actions,
    #[token("default_action")]
    DefaultAction,
    #[token("apply")]
    Apply,
    #[token("bit")]
    Bit,
    #[token("bool")]
    Bool,
    #[token("void")]
    Void,
    #[token("in")]
    In,
    #[token("out")]
    Out,
    #[token("inout")]
    InOut,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("switch")]
    Switch,
    #[token("default")]
    Default,
    #[token("return")]
    Return,
    #[token("exit")]
    Exit,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // punctuation
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token("=")]
    Gets,

    // operators
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("-")]
    Dash,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&")]
    Amp,
    #[token("^")]
    Caret,
    #[token("|")]
    Pipe,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Lte,
    #[token(">")]
    Gt,
    #[token(">=")]
    Gte,
    #[token("&&")]
    And,
    #[token("||")]
    Or,

    // anything the lexer does not recognize; reported by the parser.
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

pub fn lex(code: &str) -> Vec<Token> {
    TokenKind::lexer(code)
        .spanned()
        .map(|(kind, span)| Token {
            kind: kind.unwrap_or(TokenKind::Error),
            span,
        })
        .collect()
}

// value and optional width of a `Num` lexeme.
pub fn parse_number(lexeme: &str) -> Option<(u64, Option<u32>)> {
    fn magnitude(digits: &str) -> Option<u64> {
        match digits.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => digits.parse().ok(),
        }
    }

    match lexeme.split_once('w') {
        Some((width, digits)) => Some((magnitude(digits)?, Some(width.parse().ok()?))),
        None => Some((magnitude(lexeme)?, None)),
    }
}
