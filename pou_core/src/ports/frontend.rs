use crate::domain::ast::Program;
use crate::error::ParseError;

/// Source-format port.
/// The crate only turns POU text into the domain model; where that text
/// comes from (files, uploads, clipboards) is the caller's concern.
pub trait PouFrontend {
    /// Parse source text into a fully validated program.
    /// Never yields a partially built program: any structural problem
    /// fails with a [`ParseError`] kind instead.
    fn parse(&self, source: &str) -> Result<Program, ParseError>;
}
