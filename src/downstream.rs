//! Downstream calculation service client
//!
//! Forwards `{file, product}` to the calculation service and hands its answer
//! back untouched.

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownstreamError {
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Downstream response, forwarded verbatim
#[derive(Debug, Clone)]
pub struct Passthrough {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

#[derive(Serialize)]
struct CalculateRequest<'a> {
    file: &'a str,
    product: &'a Value,
}

/// HTTP client for the calculation service
pub struct CalculatorClient {
    endpoint: Uri,
    timeout: Duration,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl CalculatorClient {
    pub fn new(endpoint: Uri, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        // A request may already have reached the calculator when a pooled connection drops
        let client = Client::builder(TokioExecutor::new())
            .retry_canceled_requests(false)
            .build(connector);

        Self {
            endpoint,
            timeout,
            client,
        }
    }

    pub const fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// POST the file name and product downstream, single attempt
    pub async fn calculate(&self, file: &str, product: &Value) -> Result<Passthrough, DownstreamError> {
        let body = serde_json::to_vec(&CalculateRequest { file, product })?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))?;

        tokio::time::timeout(self.timeout, self.exchange(req))
            .await
            .map_err(|_| DownstreamError::Timeout(self.timeout))?
    }

    async fn exchange(&self, req: Request<Full<Bytes>>) -> Result<Passthrough, DownstreamError> {
        let resp = self.client.request(req).await?;
        let (parts, body) = resp.into_parts();
        let body = body.collect().await?.to_bytes();

        Ok(Passthrough {
            status: parts.status,
            content_type: parts.headers.get(CONTENT_TYPE).cloned(),
            body,
        })
    }
}
