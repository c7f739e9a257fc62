use std::path::Path;

use anyhow::{bail, Result};

use crate::adapters::svg::render_to_svg;
use crate::domain::ast::Program;
use crate::domain::report::report_as_text;
use crate::error::ParseError;
use crate::ports::frontend::PouFrontend;

/// Application layer use case wrapper around a [`PouFrontend`].
/// Keeps orchestration (validation, boundary checks) away from adapters.
#[derive(Debug, Clone)]
pub struct AnalysisService<F: PouFrontend> {
    frontend: F,
}

impl<F: PouFrontend> AnalysisService<F> {
    pub fn new(frontend: F) -> Self {
        Self { frontend }
    }

    /// Parse source text and run lightweight validation on the result.
    pub fn parse_source(&self, source: &str) -> Result<Program> {
        let program = self.frontend.parse(source)?;
        validate_program(&program)?;
        Ok(program)
    }

    /// Parse a POU file from disk.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Program> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|source| ParseError::UnreadableFile {
                path: path.display().to_string(),
                source,
            })?;
        self.parse_source(&source)
    }

    /// Deterministic analysis report for a parsed program.
    pub fn report(&self, program: &Program) -> String {
        report_as_text(program)
    }

    /// Render the program topology at the given scale.
    pub fn render(&self, program: &Program, scale: f64) -> Result<(u32, u32, String)> {
        Ok(render_to_svg(program, scale)?)
    }
}

fn validate_program(program: &Program) -> Result<()> {
    if program.name.trim().is_empty() {
        bail!("POU name is empty");
    }
    Ok(())
}
