// src/io/mod.rs
//
// I/O layer for the ingestion worker: typed errors, the line parser, the
// serial session manager, and the collector delivery client.

pub mod collector;
mod error;
pub mod parser;
pub mod serial;

pub use error::IoError;

use serde::Serialize;

// ============================================================================
// Shared Types
// ============================================================================

/// One accepted measurement, in the collector's wire shape.
///
/// All three fields are always present: the parser either resolves a full
/// reading from a line or rejects the line outright. Nothing downstream has
/// to handle a partial reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Reading {
    /// Acidity. Expected in [0, 14]; the parser rejects lines outside it.
    pub ph: f64,
    /// Dissolved solids concentration, ppm.
    pub tds: f64,
    /// Turbidity, NTU.
    pub turbidity: f64,
}
