//! HTTP transport: multipart POST to the upload endpoint.
//!
//! The request carries one `file` part (streamed in chunks so progress can
//! be reported as the body goes out) and, when a listing group is known, a
//! `code` text field. A 2xx response must be JSON with a non-empty `url`.

use super::transport::{ProgressFn, Transport, TransportError, UploadRequest};
use crate::config::UploadConfig;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Body chunk size; progress is reported once per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &UploadConfig) -> Result<Self, TransportError> {
        Self::with_timeout(config.endpoint.clone(), config.timeout())
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if e.is_decode() {
            TransportError::InvalidResponse(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Stream `bytes` in fixed-size chunks, reporting each one to `progress`.
fn progress_body(bytes: Arc<[u8]>, progress: ProgressFn) -> reqwest::Body {
    let total = bytes.len();
    let chunks = (0..total).step_by(CHUNK_SIZE).map(move |start| {
        let end = (start + CHUNK_SIZE).min(total);
        progress(end as u64, total as u64);
        Ok::<_, std::io::Error>(bytes[start..end].to_vec())
    });
    reqwest::Body::wrap_stream(futures_util::stream::iter(chunks))
}

impl Transport for HttpTransport {
    async fn upload(
        &self,
        request: UploadRequest,
        progress: ProgressFn,
    ) -> Result<String, TransportError> {
        let UploadRequest { file, group_code } = request;
        let total = file.len() as u64;
        let part = Part::stream_with_length(progress_body(file.bytes.clone(), progress), total)
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {e}", file.mime)))?;
        let mut form = Form::new().part("file", part);
        if let Some(code) = group_code {
            form = form.text("code", code);
        }

        tracing::debug!(file = %file.name, bytes = total, endpoint = %self.endpoint, "uploading");
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::check_status(response).await?;
        let body: UploadResponse = response.json().await.map_err(|e| self.classify(e))?;
        if body.url.trim().is_empty() {
            return Err(TransportError::InvalidResponse("empty url".into()));
        }
        Ok(body.url)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }
}
