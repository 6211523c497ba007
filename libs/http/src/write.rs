use std::future::Future;
use std::pin::Pin;

use reqwest::header::CONTENT_TYPE;

use lpwrite_api::{WriteError, WriteRequest, WriteService};

use crate::{HttpClient, error_message};

/// Write transport: один POST `/api/v2/write` на batch, без внутренних retry.
pub struct HttpWriteService {
    client: HttpClient,
}

impl HttpWriteService {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl WriteService for HttpWriteService {
    fn write<'a>(
        &'a self,
        request: WriteRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<(), WriteError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.client.endpoint("api/v2/write").map_err(WriteError::fatal)?;
            let org = request.destination.org_id.to_string();
            let bucket = request.destination.bucket_id.to_string();

            let req = self
                .client
                .http
                .post(url)
                .query(&[
                    ("org", org.as_str()),
                    ("bucket", bucket.as_str()),
                    ("precision", request.precision.as_str()),
                ])
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(request.batch.body());

            let resp = self
                .client
                .authorize(req)
                .send()
                .await
                .map_err(classify_transport)?;

            let status = resp.status();
            if status.is_success() {
                tracing::trace!(status = status.as_u16(), records = request.batch.len(), "write accepted");
                return Ok(());
            }

            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "failed to read error body");
                    String::new()
                }
            };
            Err(classify_status(status.as_u16(), &body))
        })
    }
}

fn classify_transport(e: reqwest::Error) -> WriteError {
    if e.is_builder() {
        WriteError::fatal(format!("invalid write request: {e}"))
    } else {
        WriteError::retryable(format!("failed to send write request: {e}"))
    }
}

/// Classify a non-2xx write response.
///
/// 408, 429 and every 5xx are retryable; any other status is fatal.
pub fn classify_status(status: u16, body: &str) -> WriteError {
    let message = error_message(status, body);
    let error = if matches!(status, 408 | 429 | 500..=599) {
        WriteError::retryable(message)
    } else {
        WriteError::fatal(message)
    };
    error.with_status(status)
}
