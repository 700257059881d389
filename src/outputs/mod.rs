//! Output generation for pipeline results.
//!
//! # Submodules
//!
//! - [`json`]: Writes the `ProcessNewsResponse` envelope as a JSON file

pub mod json;
