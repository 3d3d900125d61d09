//! Error types for the Kirchhoff analyzer.
//!
//! This module provides a unified error type [`KirchhoffError`] that covers
//! netlist parsing, circuit construction and the fatal topology conditions
//! that abort an analysis pass.

use thiserror::Error;

/// Result type alias using [`KirchhoffError`].
pub type Result<T> = std::result::Result<T, KirchhoffError>;

/// Unified error type for all analyzer operations.
#[derive(Error, Debug)]
pub enum KirchhoffError {
    // ============ Netlist Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid component definition
    #[error("Invalid component '{name}' at line {line}: {message}")]
    InvalidComponent {
        name: String,
        line: usize,
        message: String,
    },

    /// Unknown component type
    #[error("Unknown component type '{component_type}' at line {line}")]
    UnknownComponentType { component_type: String, line: usize },

    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for component '{component}': {message}")]
    InvalidParameter {
        component: String,
        param: String,
        message: String,
    },

    /// A wire endpoint names a device or terminal that does not exist
    #[error("Unknown terminal reference '{reference}'")]
    UnknownTerminal { reference: String },

    // ============ Circuit Construction Errors ============
    /// Duplicate device or wire name
    #[error("Duplicate element name '{name}'")]
    DuplicateName { name: String },

    /// Device has no terminal with the requested key
    #[error("Device '{device}' has no '{key}' terminal")]
    NoSuchTerminal { device: String, key: String },

    /// Terminal id does not belong to the circuit
    #[error("Terminal {terminal} does not exist in this circuit")]
    DanglingTerminal { terminal: String },

    /// A segment was requested without two bounding terminals
    #[error("Cannot build a segment for '{element}' without two terminals")]
    InvalidSegment { element: String },

    // ============ Fatal Topology Errors ============
    /// Branch or loop discovery recursed past the configured depth
    #[error("Circuit too complex or malformed: discovery depth exceeded {limit}")]
    TooDeep { limit: usize },

    /// More distinct loops than the configured cap
    #[error("Circuit too complex or malformed: more than {limit} loops")]
    TooManyLoops { limit: usize },

    // ============ Numeric Errors ============
    /// Equation system has a zero pivot
    #[error("Singular equation system - branch currents are indeterminate")]
    SingularSystem,

    // ============ I/O Errors ============
    /// Error reading a netlist file
    #[error("Failed to read netlist file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl KirchhoffError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid component error
    pub fn invalid_component(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidComponent {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        component: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            component: component.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// True for errors that abort an analysis pass because the topology is
    /// too large or pathological to enumerate.
    pub fn is_fatal_topology(&self) -> bool {
        matches!(self, Self::TooDeep { .. } | Self::TooManyLoops { .. })
    }
}
