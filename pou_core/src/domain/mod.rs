pub mod ast;
pub mod report;
