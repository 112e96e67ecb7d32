use std::{fmt::Display, rc::Rc};

use phf::phf_map;

use crate::{
    diagnostics::Diagnostics,
    token::{LiteralValue, Token, TokenKind},
};

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "base" => TokenKind::KeywordBase,
    "clase" => TokenKind::KeywordClase,
    "definir" => TokenKind::KeywordDefinir,
    "devolver" => TokenKind::KeywordDevolver,
    "falso" => TokenKind::KeywordFalso,
    "instancia" => TokenKind::KeywordInstancia,
    "mientras" => TokenKind::KeywordMientras,
    "no" => TokenKind::KeywordNo,
    "o" => TokenKind::KeywordO,
    "repetir" => TokenKind::KeywordRepetir,
    "si" => TokenKind::KeywordSi,
    "sino" => TokenKind::KeywordSino,
    "verdadero" => TokenKind::KeywordVerdadero,
    "y" => TokenKind::KeywordY,
};

/// 2^53, the largest magnitude whose integers are all exactly representable
/// in an f64. Number literals beyond it are rejected at scan time.
const MAX_LITERAL_MAGNITUDE: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct ScanError {
    kind: ScanErrorKind,
    line: usize,
}

impl Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Línea {}] Error: {}", self.line, self.kind)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanErrorKind {
    #[error("unexpected character '{0}'")]
    UnknownCharacter(char),

    #[error("closing quotation mark not found")]
    UnterminatedString,

    #[error("no two consecutive underscores")]
    ConsecutiveUnderscores,

    #[error("underscore next to the decimal separator")]
    UnderscoreNextToSeparator,

    #[error("trailing underscore in number")]
    TrailingUnderscore,

    #[error("magnitude too large to represent in memory")]
    MagnitudeTooLarge,
}

/// Turns Yatay source text into a token sequence ending in exactly one
/// `EndOfFile` token.
///
/// Scan errors go to the diagnostics sink and scanning resumes after the
/// offending bytes, so a single pass reports every lexical problem the
/// source has.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    token_start: usize,
    current: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            token_start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(mut self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.token_start = self.current;
            let Some(c) = self.advance() else {
                break;
            };

            match c {
                '(' => tokens.push(self.make_token(TokenKind::OpeningParenthesis)),
                ')' => tokens.push(self.make_token(TokenKind::ClosingParenthesis)),
                '[' => tokens.push(self.make_token(TokenKind::OpeningSquareBracket)),
                ']' => tokens.push(self.make_token(TokenKind::ClosingSquareBracket)),
                '{' => tokens.push(self.make_token(TokenKind::OpeningCurlyBrace)),
                '}' => tokens.push(self.make_token(TokenKind::ClosingCurlyBrace)),
                '.' => tokens.push(self.make_token(TokenKind::Dot)),
                ',' => tokens.push(self.make_token(TokenKind::Comma)),
                ';' => tokens.push(self.make_token(TokenKind::Semicolon)),
                '#' => tokens.push(self.make_token(TokenKind::Hash)),
                '+' => tokens.push(self.make_token(TokenKind::Plus)),
                '-' => tokens.push(self.make_token(TokenKind::Minus)),
                '*' => tokens.push(self.make_token(TokenKind::Asterisk)),
                '/' => {
                    if self.matches('/') {
                        tokens.push(self.make_token(TokenKind::DoubleSlash));
                    } else {
                        tokens.push(self.make_token(TokenKind::Slash));
                    }
                }
                ':' => {
                    if self.matches(':') {
                        // Line comment. The newline is left for the main loop
                        // so it still bumps the line counter.
                        while !matches!(self.peek(), Some('\n') | None) {
                            self.advance();
                        }
                    } else {
                        tokens.push(self.make_token(TokenKind::Colon));
                    }
                }
                '=' => {
                    if self.matches('<') {
                        tokens.push(self.make_token(TokenKind::LessOrEqual));
                    } else {
                        tokens.push(self.make_token(TokenKind::Equal));
                    }
                }
                '>' => {
                    if self.matches('<') {
                        tokens.push(self.make_token(TokenKind::Unequal));
                    } else if self.matches('=') {
                        tokens.push(self.make_token(TokenKind::GreaterOrEqual));
                    } else {
                        tokens.push(self.make_token(TokenKind::Greater));
                    }
                }
                '<' => {
                    if self.matches('=') {
                        tokens.push(self.make_token(TokenKind::Assign));
                    } else {
                        tokens.push(self.make_token(TokenKind::Less));
                    }
                }
                ' ' | '\r' | '\t' => {}
                '\n' => self.line += 1,
                '"' => {
                    if let Some(token) = self.string_literal(diagnostics) {
                        tokens.push(token);
                    }
                }
                '0'..='9' => {
                    if let Some(token) = self.number_literal(diagnostics) {
                        tokens.push(token);
                    }
                }
                c if is_identifier_start(c) => tokens.push(self.identifier()),
                c => {
                    let error = ScanError::new(ScanErrorKind::UnknownCharacter(c), self.line);
                    diagnostics.static_error(&error);
                }
            }
        }

        tokens.push(Token::new(TokenKind::EndOfFile, Rc::from(""), None, self.line));
        tokens
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();
        Some(c)
    }

    /// Consumes the next character only if it is the expected one.
    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.token_start..self.current]
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Rc::from(self.lexeme()), None, self.line)
    }

    /// Scans the remainder of a string literal; the opening quote is already
    /// consumed. Strings may not span lines: a newline (left unconsumed for
    /// the main loop) or end of source is an error and produces no token.
    fn string_literal(&mut self, diagnostics: &mut Diagnostics) -> Option<Token> {
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    let value = &self.source[self.token_start + 1..self.current - 1];
                    return Some(Token::new(
                        TokenKind::String,
                        Rc::from(self.lexeme()),
                        Some(LiteralValue::Text(Rc::from(value))),
                        self.line,
                    ));
                }
                Some('\n') | None => {
                    let error = ScanError::new(ScanErrorKind::UnterminatedString, self.line);
                    diagnostics.static_error(&error);
                    return None;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Scans the remainder of a number literal; the first digit is already
    /// consumed. Underscores may separate digits one at a time, and a single
    /// `,` introduces the fractional part.
    fn number_literal(&mut self, diagnostics: &mut Diagnostics) -> Option<Token> {
        if let Err(kind) = self.digit_run() {
            return self.reject_number(kind, diagnostics);
        }

        // Only a `,` glued to a digit or an (erroneous) underscore belongs to
        // the number; anything else leaves the `,` as a Comma token.
        if self.peek() == Some(',') && matches!(self.peek_second(), Some('0'..='9' | '_')) {
            self.advance();
            if self.peek() == Some('_') {
                return self.reject_number(ScanErrorKind::UnderscoreNextToSeparator, diagnostics);
            }
            if let Err(kind) = self.digit_run() {
                return self.reject_number(kind, diagnostics);
            }
        }

        let normalized: String = self
            .lexeme()
            .chars()
            .filter(|&c| c != '_')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        let number: f64 = normalized
            .parse()
            .expect("normalized number lexeme contains only digits and at most one '.'");

        if number.abs() > MAX_LITERAL_MAGNITUDE {
            return self.reject_number(ScanErrorKind::MagnitudeTooLarge, diagnostics);
        }

        Some(Token::new(
            TokenKind::Number,
            Rc::from(self.lexeme()),
            Some(LiteralValue::Number(number)),
            self.line,
        ))
    }

    /// Consumes a run of digits separated by single underscores, stopping
    /// before the first character that belongs to neither.
    fn digit_run(&mut self) -> Result<(), ScanErrorKind> {
        loop {
            match self.peek() {
                Some('0'..='9') => {
                    self.advance();
                }
                Some('_') => {
                    self.advance();
                    match self.peek() {
                        Some('0'..='9') => {}
                        Some('_') => return Err(ScanErrorKind::ConsecutiveUnderscores),
                        Some(',') => return Err(ScanErrorKind::UnderscoreNextToSeparator),
                        _ => return Err(ScanErrorKind::TrailingUnderscore),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Reports a malformed number and swallows the rest of it so scanning
    /// resumes at the first character past the literal.
    fn reject_number(
        &mut self,
        kind: ScanErrorKind,
        diagnostics: &mut Diagnostics,
    ) -> Option<Token> {
        let error = ScanError::new(kind, self.line);
        diagnostics.static_error(&error);

        loop {
            match self.peek() {
                Some('0'..='9' | '_') => {
                    self.advance();
                }
                Some(',') if matches!(self.peek_second(), Some('0'..='9' | '_')) => {
                    self.advance();
                }
                _ => break,
            }
        }
        None
    }

    fn identifier(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if is_identifier_part(c)) {
            self.advance();
        }

        let kind = KEYWORDS
            .get(self.lexeme())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }
}

/// Identifier heads: ASCII letters in either case, the Spanish letters
/// `á é í ó ú ü ñ` in either case, and `_`.
fn is_identifier_start(c: char) -> bool {
    matches!(c,
        'a'..='z'
        | 'A'..='Z'
        | '_'
        | 'á' | 'é' | 'í' | 'ó' | 'ú' | 'ü' | 'ñ'
        | 'Á' | 'É' | 'Í' | 'Ó' | 'Ú' | 'Ü' | 'Ñ')
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (Vec<Token>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
        (tokens, diagnostics)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_yields_only_eof() {
        for source in ["", " ", "\t \r "] {
            let (tokens, diagnostics) = scan(source);
            assert_eq!(kinds(&tokens), vec![TokenKind::EndOfFile]);
            assert_eq!(tokens[0].line, 1);
            assert!(!diagnostics.had_static_error());
        }
    }

    #[test]
    fn newlines_advance_the_line_counter() {
        let (tokens, _) = scan("\n\n\n");
        assert_eq!(kinds(&tokens), vec![TokenKind::EndOfFile]);
        assert_eq!(tokens[0].line, 4);
    }

    #[test]
    fn single_character_tokens() {
        let (tokens, diagnostics) = scan("()[]{}.,;#+-*");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::OpeningParenthesis,
                TokenKind::ClosingParenthesis,
                TokenKind::OpeningSquareBracket,
                TokenKind::ClosingSquareBracket,
                TokenKind::OpeningCurlyBrace,
                TokenKind::ClosingCurlyBrace,
                TokenKind::Dot,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Hash,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Asterisk,
                TokenKind::EndOfFile,
            ]
        );
        assert!(!diagnostics.had_static_error());
    }

    #[test]
    fn operators_use_longest_match() {
        let (tokens, _) = scan("=< = >< >= > <= < : / //");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::LessOrEqual,
                TokenKind::Equal,
                TokenKind::Unequal,
                TokenKind::GreaterOrEqual,
                TokenKind::Greater,
                TokenKind::Assign,
                TokenKind::Less,
                TokenKind::Colon,
                TokenKind::Slash,
                TokenKind::DoubleSlash,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn line_comment_runs_to_end_of_line() {
        let (tokens, _) = scan(":: un comentario + - *\n1.");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Number, TokenKind::Dot, TokenKind::EndOfFile]
        );
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn string_literal_keeps_inner_text() {
        let (tokens, diagnostics) = scan("\"hola mundo\"");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme.as_ref(), "\"hola mundo\"");
        assert_eq!(
            tokens[0].literal,
            Some(LiteralValue::Text(Rc::from("hola mundo")))
        );
        assert!(!diagnostics.had_static_error());
    }

    #[test]
    fn unterminated_string_at_end_of_source_is_an_error() {
        let (tokens, diagnostics) = scan("\"hola ");
        assert_eq!(kinds(&tokens), vec![TokenKind::EndOfFile]);
        assert!(diagnostics.had_static_error());
    }

    #[test]
    fn string_may_not_span_lines() {
        let (tokens, diagnostics) = scan("\"hola\n1.");
        assert!(diagnostics.had_static_error());
        // Scanning resumes past the newline.
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Number, TokenKind::Dot, TokenKind::EndOfFile]
        );
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn numbers_support_underscores_and_comma_decimals() {
        let (tokens, diagnostics) = scan("1_000_000 2,5 0,2_5");
        assert!(!diagnostics.had_static_error());
        assert_eq!(
            tokens[0].literal,
            Some(LiteralValue::Number(1_000_000.0))
        );
        assert_eq!(tokens[1].literal, Some(LiteralValue::Number(2.5)));
        assert_eq!(tokens[2].literal, Some(LiteralValue::Number(0.25)));
        assert_eq!(tokens[0].lexeme.as_ref(), "1_000_000");
    }

    #[test]
    fn comma_not_followed_by_digit_is_a_comma_token() {
        let (tokens, diagnostics) = scan("1, 2");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Number,
                TokenKind::Comma,
                TokenKind::Number,
                TokenKind::EndOfFile,
            ]
        );
        assert!(!diagnostics.had_static_error());
    }

    #[test]
    fn consecutive_underscores_are_an_error() {
        let (tokens, diagnostics) = scan("1__2.");
        assert!(diagnostics.had_static_error());
        // The malformed literal is swallowed whole.
        assert_eq!(kinds(&tokens), vec![TokenKind::Dot, TokenKind::EndOfFile]);
    }

    #[test]
    fn underscore_next_to_the_separator_is_an_error() {
        for source in ["1_,5", "1,_5"] {
            let (_, diagnostics) = scan(source);
            assert!(diagnostics.had_static_error(), "accepted {source:?}");
        }
    }

    #[test]
    fn trailing_underscore_is_an_error() {
        let (tokens, diagnostics) = scan("12_ + 1");
        assert!(diagnostics.had_static_error());
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Plus, TokenKind::Number, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn magnitude_beyond_exact_integer_range_is_an_error() {
        let (_, diagnostics) = scan("10_000_000_000_000_000");
        assert!(diagnostics.had_static_error());

        let (tokens, diagnostics) = scan("9_007_199_254_740_992");
        assert!(!diagnostics.had_static_error());
        assert_eq!(
            tokens[0].literal,
            Some(LiteralValue::Number(9_007_199_254_740_992.0))
        );
    }

    #[test]
    fn identifiers_allow_spanish_letters() {
        let (tokens, _) = scan("año _interno Ñandú cifra1");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::EndOfFile,
            ]
        );
        assert_eq!(tokens[0].lexeme.as_ref(), "año");
        assert_eq!(tokens[2].lexeme.as_ref(), "Ñandú");
    }

    #[test]
    fn keywords_are_recognised_exactly() {
        let (tokens, _) = scan(
            "base clase definir devolver falso instancia mientras no o \
             repetir si sino verdadero y",
        );
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::KeywordBase,
                TokenKind::KeywordClase,
                TokenKind::KeywordDefinir,
                TokenKind::KeywordDevolver,
                TokenKind::KeywordFalso,
                TokenKind::KeywordInstancia,
                TokenKind::KeywordMientras,
                TokenKind::KeywordNo,
                TokenKind::KeywordO,
                TokenKind::KeywordRepetir,
                TokenKind::KeywordSi,
                TokenKind::KeywordSino,
                TokenKind::KeywordVerdadero,
                TokenKind::KeywordY,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn capitalized_keyword_is_an_identifier() {
        let (tokens, _) = scan("Verdadero");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
    }

    #[test]
    fn unknown_character_is_reported_and_skipped() {
        let (tokens, diagnostics) = scan("1 @ 2");
        assert!(diagnostics.had_static_error());
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Number, TokenKind::Number, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn lexemes_are_exact_source_substrings() {
        let source = "definir x <= 1_0,5.";
        let (tokens, _) = scan(source);
        for token in &tokens {
            assert!(
                source.contains(token.lexeme.as_ref()),
                "lexeme {:?} not in source",
                token.lexeme
            );
        }
        let joined: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_ref()).collect();
        assert_eq!(joined.join(" "), "definir x <= 1_0,5 . ");
    }

    #[test]
    fn tokens_carry_their_line() {
        let (tokens, _) = scan("1.\n2.\n\n3.");
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 1, 2, 2, 4, 4, 4]);
    }
}
