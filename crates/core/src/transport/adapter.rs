use std::sync::Arc;

use reqwest::header::HeaderMap;
use tracing::debug;

use super::{RpcRequest, RpcResponse, Transport};
use crate::error::{Code, Error, Result};

/// Metadata key carrying the numeric status.
pub const STATUS_KEY: &str = "grpc-status";
/// Metadata key carrying the percent-encoded status message.
pub const MESSAGE_KEY: &str = "grpc-message";
/// Message used when the backend sent none, or one that cannot be decoded.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";

/// Classify response (or trailer) metadata.
///
/// An absent status, or the canonical `0`, is success. Anything else becomes
/// [`Error::Status`] with the percent-decoded message.
pub fn check_status(metadata: &HeaderMap) -> Result<()> {
    let Some(status) = metadata.get(STATUS_KEY) else {
        return Ok(());
    };

    let code = status
        .to_str()
        .map(Code::from_metadata)
        .unwrap_or(Code::Unknown);
    if code == Code::Ok {
        return Ok(());
    }

    let message = metadata
        .get(MESSAGE_KEY)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());

    Err(Error::status(code, message))
}

/// Wraps the network primitive and reclassifies failed responses.
///
/// Shared by both channels so that every caller sees the same error taxonomy.
#[derive(Clone)]
pub struct TransportAdapter {
    inner: Arc<dyn Transport>,
}

impl TransportAdapter {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }

    /// Issue the request and fail if the response metadata encodes an error.
    pub async fn send(&self, request: RpcRequest) -> Result<RpcResponse> {
        let path = request.path.clone();
        let response = self.inner.call(request).await?;

        if let Err(err) = check_status(&response.metadata) {
            debug!(%path, "call rejected: {err}");
            return Err(err);
        }

        let has_status = response.metadata.contains_key(STATUS_KEY);
        if !has_status && !(200..300).contains(&response.http_status) {
            debug!(%path, status = response.http_status, "call failed without grpc status");
            return Err(Error::status(
                Code::from_http_status(response.http_status),
                format!("HTTP {}", response.http_status),
            ));
        }

        Ok(response)
    }
}
