pub mod description;
pub mod fbd;
pub mod svg;
