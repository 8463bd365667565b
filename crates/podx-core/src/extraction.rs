use std::path::Path;

use async_trait::async_trait;

use crate::document::ExtractionResult;
use crate::error::Result;

/// Runs the full upload, transfer, extract and persist sequence for one document.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<ExtractionResult>;
}
