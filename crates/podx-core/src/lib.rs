pub mod config;
pub mod document;
pub mod error;
pub mod extraction;
pub mod schema;

pub use config::ClientConfig;
pub use document::{output_path_for, ExtractRequest, ExtractionResult, UploadHandle};
pub use error::{PodxError, Result};
pub use extraction::DocumentExtractor;
pub use schema::ExtractionSchema;
