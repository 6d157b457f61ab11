//! Output generation for front-end consumption.
//!
//! # Submodules
//!
//! - [`json`]: Writes [`crate::models::MapSnapshot`] documents for the map page

pub mod json;
