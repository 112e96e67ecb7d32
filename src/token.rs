use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// The full set of token kinds Yatay source can produce.
///
/// Several keywords (`clase`, `devolver`, `si`, ...) are recognised here but
/// have no grammar productions yet; the parser's recovery logic still keys on
/// them as statement starters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    // Guaranteed single-character tokens.
    OpeningParenthesis,
    ClosingParenthesis,
    OpeningSquareBracket,
    ClosingSquareBracket,
    OpeningCurlyBrace,
    ClosingCurlyBrace,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Hash,
    Plus,
    Minus,
    Asterisk,

    // One or two character tokens.
    Assign,
    Slash,
    DoubleSlash,
    Equal,
    Unequal,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,

    // Literals and identifiers.
    Identifier,
    String,
    Number,

    // Keywords.
    KeywordY,
    KeywordO,
    KeywordNo,
    KeywordDefinir,
    KeywordClase,
    KeywordInstancia,
    KeywordBase,
    KeywordVerdadero,
    KeywordFalso,
    KeywordSi,
    KeywordSino,
    KeywordRepetir,
    KeywordMientras,
    KeywordDevolver,

    // End-of-file token.
    EndOfFile,
}

/// The literal payload carried by `String` and `Number` tokens.
/// Every other kind carries no literal at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Text(Rc<str>),
    Number(f64),
}

/// A lexical atom. The lexeme is the exact substring of source that produced
/// the token; `line` is 1-based. Tokens are immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Rc<str>,
    pub literal: Option<LiteralValue>,
    pub line: usize,
}

impl Token {
    /// The location text used by parse error reports: `el final` for the
    /// end-of-file sentinel, the quoted lexeme for everything else.
    pub fn location(&self) -> String {
        if self.kind == TokenKind::EndOfFile {
            "el final".to_string()
        } else {
            format!("\"{}\"", self.lexeme)
        }
    }
}
