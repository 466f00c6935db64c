//! Report rendering
//!
//! CSV, JSON and plain-text renderers for observed links, diffs and the
//! run summary. Every renderer returns a `String`; writing files is the
//! caller's job.

pub mod csv;
pub mod json;
pub mod text;

pub use csv::*;
pub use json::*;
pub use text::*;
