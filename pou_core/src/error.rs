//! Structured errors, one enum per failure stage.
//! Every core operation either returns a fully valid result or one of
//! these kinds; nothing is recovered or retried inside the crate.

use thiserror::Error;

/// Failures while turning POU source text into a [`crate::ast::Program`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read POU file '{path}': {source}")]
    UnreadableFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed section at line {line}: {detail}")]
    MalformedSection { line: usize, detail: String },

    #[error("duplicate variable name '{name}'")]
    DuplicateVariableName { name: String },

    #[error("unknown variable kind keyword '{keyword}' at line {line}")]
    UnknownVariableKind { keyword: String, line: usize },

    #[error("connection endpoint '{owner}.{pin}' does not resolve to a declared pin or variable")]
    DanglingConnectionReference { owner: String, pin: String },
}

/// Failures while laying out a program for rendering.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("block '{block}' has no layout position")]
    MissingPosition { block: String },
}

/// Failures while reading or rewriting a description file.
#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("description file not found: {path}")]
    FileNotFound { path: String },

    #[error("malformed description file '{path}': {detail}")]
    MalformedDescriptionFile { path: String, detail: String },

    #[error("io error on description file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
