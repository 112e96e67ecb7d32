//! The Yatay language core: scanner, recursive-descent parser, and
//! tree-walking interpreter for a small Spanish-keyword teaching language.

pub mod diagnostics;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use diagnostics::Diagnostics;
use interpreter::Interpreter;
use parser::Parser;
use scanner::Scanner;

/// Runs a source string through the full pipeline: scan, then parse, and
/// interpret only when no static error occurred. All failures land in the
/// diagnostics sink; the caller decides what they mean.
pub fn run(source: &str, diagnostics: &mut Diagnostics) {
    let tokens = Scanner::new(source).scan_tokens(diagnostics);
    let program = Parser::new(tokens.into_iter()).parse(diagnostics);

    if diagnostics.had_static_error() {
        return;
    }

    Interpreter::new().interpret(&program, diagnostics);
}
