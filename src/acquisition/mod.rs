//! Tiered acquisition of paper content

pub mod batch;
pub mod engine;
pub mod renderer;

pub use batch::{AcquisitionBatch, AcquisitionReport};
pub use engine::{AcquisitionOutcome, ConversionSource, TieredAcquisitionEngine, ABSTRACT_MARKER};
pub use renderer::{PdfRenderer, WkhtmltopdfRenderer};
