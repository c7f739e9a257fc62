//! Core POU analysis crate.
//! Responsibilities: parse textual POU/FBD sources into the domain model,
//! derive the metrics report, round-trip description files, render the
//! block-and-wire topology to SVG.
//! Non-goals: executing PLC logic, storage/upload (handled by upper layers).

pub mod adapters;
pub mod application;
pub mod domain;
pub mod error;
pub mod ports;

pub use domain::ast;
pub use domain::report::report_as_text;

pub use adapters::description::{change_pou_description, get_pou_description, REPORT_MARKER};
pub use adapters::fbd::{parse_pou_file, FbdTextFrontend};
pub use adapters::svg::{render_to_svg, self_contained_style_header, RenderConfig};
pub use application::service::AnalysisService;
pub use error::{DescriptionError, LayoutError, ParseError};
pub use ports::frontend::PouFrontend;
