use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::ExtractionSchema;

pub const OUTPUT_EXTENSION: &str = "json";

/// Upload slot issued by the service: where to send the bytes, and the id to
/// reference the stored document by afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadHandle {
    pub presigned_url: String,
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractRequest<'a> {
    pub document_url: &'a str,
    pub schema: &'a ExtractionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document: PathBuf,
    pub output_path: PathBuf,
    /// Response body exactly as parsed from the extract endpoint.
    pub output: serde_json::Value,
    pub extracted_at: DateTime<Utc>,
}

/// Sibling path the extraction output for `document` is written to.
pub fn output_path_for(document: &Path) -> PathBuf {
    document.with_extension(OUTPUT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_replaces_extension() {
        assert_eq!(output_path_for(Path::new("./pg1.pdf")), PathBuf::from("./pg1.json"));
        assert_eq!(
            output_path_for(Path::new("/tmp/scans/batch.2/pod.PDF")),
            PathBuf::from("/tmp/scans/batch.2/pod.json")
        );
    }

    #[test]
    fn test_output_path_without_extension() {
        assert_eq!(output_path_for(Path::new("scan")), PathBuf::from("scan.json"));
    }

    #[test]
    fn test_extract_request_shape() {
        let schema = ExtractionSchema::proof_of_delivery();
        let request = ExtractRequest {
            document_url: "reducto://abc",
            schema: &schema,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["document_url"], "reducto://abc");
        assert_eq!(json["schema"]["required"][0], "referenceIds");
    }

    #[test]
    fn test_upload_handle_ignores_extra_fields() {
        let handle: UploadHandle = serde_json::from_str(
            r#"{"presigned_url": "https://s3/put?sig=1", "file_id": "reducto://f1", "expires_in": 3600}"#,
        )
        .unwrap();
        assert_eq!(handle.file_id, "reducto://f1");
        assert_eq!(handle.presigned_url, "https://s3/put?sig=1");
    }
}
