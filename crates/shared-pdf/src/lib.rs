//! Shared PDF handling utilities
//!
//! AcroForm field detection, filling and flattening. Callers only ever see
//! byte buffers wrapped in [`shared_types::Document`]; the `lopdf` object
//! model stays inside this crate.

pub mod error;
pub mod forms;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use error::FormError;
pub use forms::{detect_fields, fill_and_flatten};
