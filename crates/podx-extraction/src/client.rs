use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Response;
use serde::de::DeserializeOwned;

use podx_core::config::ClientConfig;
use podx_core::document::{output_path_for, ExtractRequest, ExtractionResult, UploadHandle};
use podx_core::error::{PodxError, Result};
use podx_core::extraction::DocumentExtractor;
use podx_core::schema::ExtractionSchema;

const USER_AGENT: &str = concat!("podx/", env!("CARGO_PKG_VERSION"));

/// Client for the Reducto upload and extract endpoints.
///
/// Cloning is cheap: the HTTP connection pool, config and schema are shared.
#[derive(Clone)]
pub struct ReductoClient {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
    schema: Arc<ExtractionSchema>,
}

impl ReductoClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_schema(config, ExtractionSchema::proof_of_delivery())
    }

    pub fn with_schema(config: ClientConfig, schema: ExtractionSchema) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
            schema: Arc::new(schema),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str> {
        let key = self.config.api_key.trim();
        if key.is_empty() {
            return Err(PodxError::Config("API key is empty".into()));
        }
        Ok(key)
    }

    async fn request_upload(&self) -> Result<UploadHandle> {
        let api_key = self.api_key()?;
        let url = self.config.endpoint("upload")?;

        tracing::debug!(%url, "Requesting upload slot");

        let response = self.client.post(url).bearer_auth(api_key).send().await?;
        let response = check_status("upload", response).await?;
        parse_body(response).await
    }

    /// The presigned URL carries its own credential, so no bearer token is sent
    /// to the storage host.
    async fn transfer(&self, handle: &UploadHandle, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PodxError::io(path, e))?;

        tracing::debug!(
            file_id = %handle.file_id,
            bytes = bytes.len(),
            "Transferring document bytes"
        );

        let response = self
            .client
            .put(&handle.presigned_url)
            .body(bytes)
            .send()
            .await?;
        check_status("transfer", response).await?;
        Ok(())
    }

    async fn request_extraction(&self, handle: &UploadHandle) -> Result<serde_json::Value> {
        let api_key = self.api_key()?;
        let url = self.config.endpoint("extract")?;
        let request = ExtractRequest {
            document_url: &handle.file_id,
            schema: &self.schema,
        };

        tracing::debug!(%url, file_id = %handle.file_id, "Requesting extraction");

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status("extract", response).await?;
        parse_body(response).await
    }
}

#[async_trait]
impl DocumentExtractor for ReductoClient {
    async fn extract(&self, path: &Path) -> Result<ExtractionResult> {
        tracing::info!(document = %path.display(), "Starting extraction");

        let handle = self.request_upload().await?;
        self.transfer(&handle, path).await?;
        let output = self.request_extraction(&handle).await?;

        let output_path = output_path_for(path);
        let serialized = serde_json::to_vec_pretty(&output)?;
        tokio::fs::write(&output_path, &serialized)
            .await
            .map_err(|e| PodxError::io(&output_path, e))?;

        tracing::info!(
            document = %path.display(),
            output = %output_path.display(),
            file_id = %handle.file_id,
            "Extraction complete"
        );

        Ok(ExtractionResult {
            document: path.to_path_buf(),
            output_path,
            output,
            extracted_at: Utc::now(),
        })
    }
}

async fn check_status(step: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read body>".to_string());
    tracing::warn!(step, status = status.as_u16(), "Remote call failed");
    Err(PodxError::Remote {
        step,
        status: status.as_u16(),
        body,
    })
}

async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
