//! Conversion pipeline components.
//!
//! - **discovery**: walk input trees and select candidates
//! - **paths**: derive output paths and normalize path identity
//! - **seen**: run-scoped deduplication ledger
//! - **decode**: decode containers picked by byte signature
//! - **validate**: size and dimension limits
//! - **processor**: single-file conversion and tree-mode batches

pub mod decode;
pub mod discovery;
pub mod paths;
pub mod processor;
pub mod seen;
pub mod validate;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder, SUPPORTED_EXTENSIONS};
pub use discovery::CandidateFilter;
pub use paths::{derive_output_path, normalize_path};
pub use processor::{BatchJob, Converter};
pub use seen::SeenSet;
pub use validate::Validator;
