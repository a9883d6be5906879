//! Request/response exchange underneath both RPC channels.

/// Status inspection applied to every response.
pub mod adapter;
/// gRPC-web body framing.
pub mod codec;
/// `reqwest`-backed network primitive.
pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::HeaderMap;

use crate::error::Result;

pub use adapter::{check_status, TransportAdapter, DEFAULT_ERROR_MESSAGE};
pub use codec::{Frame, FrameDecoder};
pub use http::HttpTransport;

/// Response body as it arrives from the network.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// One outgoing call before it hits the network.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    /// `/{service}/{method}` path of the call.
    pub path: String,
    /// Outgoing call metadata (sent as request headers).
    pub metadata: HeaderMap,
    /// Framed request message.
    pub body: Bytes,
    /// Deadline for the whole exchange, if any.
    pub timeout: Option<Duration>,
}

impl RpcRequest {
    /// Build a request for `service`/`method` carrying an already-framed body.
    pub fn new(service: &str, method: &str, body: Bytes) -> Self {
        Self {
            path: format!("/{service}/{method}"),
            metadata: HeaderMap::new(),
            body,
            timeout: None,
        }
    }
}

/// Raw response returned by a [`Transport`].
pub struct RpcResponse {
    /// HTTP status of the exchange.
    pub http_status: u16,
    /// Response metadata (headers).
    pub metadata: HeaderMap,
    /// Framed body, possibly still streaming.
    pub body: BodyStream,
}

impl std::fmt::Debug for RpcResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcResponse")
            .field("http_status", &self.http_status)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Network call primitive.
///
/// Implementations only move bytes: any failure to obtain a response must be
/// reported as [`crate::Error::Network`], while a response that arrived is
/// returned as-is for the [`TransportAdapter`] to classify.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request/response exchange.
    async fn call(&self, request: RpcRequest) -> Result<RpcResponse>;
}
