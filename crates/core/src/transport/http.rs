use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{
    header::{self, HeaderValue},
    Client,
};
use tracing::debug;

use super::{codec::GRPC_WEB_CONTENT_TYPE, RpcRequest, RpcResponse, Transport};
use crate::error::{Error, Result};

/// gRPC-web over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url` (e.g. `http://localhost:5900`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing `reqwest` client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Endpoint root, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, request: RpcRequest) -> Result<RpcResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(%url, "sending grpc-web request");

        let mut builder = self
            .client
            .post(&url)
            .headers(request.metadata)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static(GRPC_WEB_CONTENT_TYPE),
            )
            .header("x-grpc-web", HeaderValue::from_static("1"))
            .body(request.body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let http_status = response.status().as_u16();
        let metadata = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::from))
            .boxed();

        Ok(RpcResponse {
            http_status,
            metadata,
            body,
        })
    }
}
