//! Netlist parser for circuit descriptions.
//!
//! A small line-oriented text format for building a [`Circuit`](crate::Circuit)
//! outside an interactive editor: one device or wire per line, with the
//! element kind inferred from its name prefix.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist   = { line }
//! line      = comment | directive | device | wire | empty
//! comment   = ('#' | ';') { any_char }
//! directive = ".option" { key '=' number }
//! device    = name { number } [state] { key '=' value }
//! wire      = name endpoint endpoint { key '=' value }
//! endpoint  = device_name '.' terminal_key | "nc"
//!
//! number    = ['-'] digit+ ['.' digit+] [('e'|'E') ['-'|'+'] digit+] [suffix]
//! suffix    = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G'
//! ```
//!
//! # Element Types
//!
//! | Prefix | Element | Syntax |
//! |--------|---------|--------|
//! | BAT | Battery | `BAT<name> <emf> [r=<internal>]` |
//! | R | Resistor | `R<name> <resistance>` |
//! | SW | Switch | `SW<name> [open\|closed]` |
//! | POT | Potentiometer | `POT<name> <total> [position]` |
//! | AM | Ammeter | `AM<name>` |
//! | VM | Voltmeter | `VM<name>` |
//! | W | Wire | `W<name> <DEV.key\|nc> <DEV.key\|nc>` |
//!
//! Any element accepts `fault=short` or `fault=open`.
//!
//! # Example
//!
//! ```text
//! # Battery driving two resistors in series
//! BAT1 9
//! R1   100
//! R2   200
//! W1   BAT1.pos R1.left
//! W2   R1.right R2.left
//! W3   R2.right BAT1.neg
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a netlist string into an AST.
pub fn parse(input: &str) -> Result<NetlistAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a netlist file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<NetlistAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::KirchhoffError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
