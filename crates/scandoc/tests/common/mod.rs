//! Shared test utilities for scandoc integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated pipeline runs with temp storage and database
//! - `PdfBuilder` for producing scanned-style PDFs programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ShadeRecognizer, TestHarness};
