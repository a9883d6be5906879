//! A configured pathway for issuing calls against one service.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures::{stream, stream::BoxStream, Stream, StreamExt};
use prost::Message;
use tracing::debug;

use crate::{
    error::{Error, Result},
    transport::{
        check_status, codec::encode_message, BodyStream, Frame, FrameDecoder, RpcRequest,
        Transport, TransportAdapter,
    },
};

/// Request-pipeline stage run on every outgoing call before it is sent.
pub trait Interceptor: Send + Sync {
    /// Inspect or amend the request. Returning an error aborts the call
    /// without touching the network.
    fn intercept(&self, request: &mut RpcRequest) -> Result<()>;
}

/// Transport adapter plus an ordered list of interceptors, bound to a service.
#[derive(Clone)]
pub struct Channel {
    service: &'static str,
    adapter: TransportAdapter,
    interceptors: Vec<Arc<dyn Interceptor>>,
    timeout: Option<Duration>,
}

impl Channel {
    /// Channel for the fully-qualified `service`, with no interceptors or deadline.
    pub fn new(service: &'static str, transport: Arc<dyn Transport>) -> Self {
        Self {
            service,
            adapter: TransportAdapter::new(transport),
            interceptors: Vec::new(),
            timeout: None,
        }
    }

    /// Append an interceptor to the request pipeline.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Deadline applied to unary calls. Streaming calls are never timed out.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fully-qualified service name.
    pub fn service(&self) -> &'static str {
        self.service
    }

    fn prepare<M: Message>(&self, method: &str, message: &M) -> Result<RpcRequest> {
        let mut request = RpcRequest::new(self.service, method, encode_message(message));
        for interceptor in &self.interceptors {
            interceptor.intercept(&mut request)?;
        }
        Ok(request)
    }

    /// Issue a unary call and decode its single response message.
    pub async fn unary<Req, Resp>(&self, method: &str, message: &Req) -> Result<Resp>
    where
        Req: Message,
        Resp: Message + Default + 'static,
    {
        let mut request = self.prepare(method, message)?;
        request.timeout = self.timeout;
        debug!(path = %request.path, "unary call");

        let response = self.adapter.send(request).await?;
        let mut messages = decode_messages::<Resp>(response.body);

        let first = match messages.next().await {
            Some(result) => result?,
            None => {
                return Err(Error::Protocol(format!(
                    "{}/{method} returned no message",
                    self.service
                )))
            }
        };

        match messages.next().await {
            None => Ok(first),
            Some(Err(err)) => Err(err),
            Some(Ok(_)) => Err(Error::Protocol(format!(
                "{}/{method} returned more than one message",
                self.service
            ))),
        }
    }

    /// Open a server-streaming call.
    ///
    /// Resolves once the response headers have been accepted; messages are
    /// then decoded lazily as the caller polls the stream.
    pub async fn server_streaming<Req, Resp>(
        &self,
        method: &str,
        message: &Req,
    ) -> Result<Streaming<Resp>>
    where
        Req: Message,
        Resp: Message + Default + 'static,
    {
        let request = self.prepare(method, message)?;
        debug!(path = %request.path, "streaming call");

        let response = self.adapter.send(request).await?;
        Ok(Streaming {
            inner: decode_messages(response.body),
        })
    }
}

/// Decoded messages of a server-streaming call.
///
/// A non-OK status in the closing trailers is yielded as the final item.
pub struct Streaming<T> {
    inner: BoxStream<'static, Result<T>>,
}

impl<T> Stream for Streaming<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

struct DecodeState {
    body: BodyStream,
    decoder: FrameDecoder,
    finished: bool,
}

fn decode_messages<T>(body: BodyStream) -> BoxStream<'static, Result<T>>
where
    T: Message + Default + 'static,
{
    let state = DecodeState {
        body,
        decoder: FrameDecoder::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            match state.decoder.next_frame() {
                Ok(Some(Frame::Data(payload))) => {
                    return Some((T::decode(payload).map_err(Error::from), state));
                }
                Ok(Some(Frame::Trailers(trailers))) => {
                    state.finished = true;
                    return check_status(&trailers).err().map(|err| (Err(err), state));
                }
                Ok(None) => {}
                Err(err) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.decoder.push(&chunk),
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    if state.decoder.is_empty() {
                        return None;
                    }
                    return Some((
                        Err(Error::Protocol("response ended mid-frame".to_string())),
                        state,
                    ));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Code,
        proto::{GetAccountRequest, GetAccountResponse, UserAccountInfo},
        transport::{codec::encode_trailers, RpcResponse},
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use reqwest::header::{HeaderMap, HeaderValue};

    struct Scripted {
        chunks: Vec<Bytes>,
        seen: Mutex<Vec<RpcRequest>>,
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn call(&self, request: RpcRequest) -> Result<RpcResponse> {
            self.seen.lock().push(request);
            let chunks: Vec<Result<Bytes>> = self.chunks.iter().cloned().map(Ok).collect();
            Ok(RpcResponse {
                http_status: 200,
                metadata: HeaderMap::new(),
                body: stream::iter(chunks).boxed(),
            })
        }
    }

    fn account() -> GetAccountResponse {
        GetAccountResponse {
            user_account_info: Some(UserAccountInfo {
                id: 7,
                username: "digger".to_string(),
            }),
        }
    }

    fn trailers(status: &'static str, message: Option<&'static str>) -> Bytes {
        let mut map = HeaderMap::new();
        map.insert("grpc-status", HeaderValue::from_static(status));
        if let Some(message) = message {
            map.insert("grpc-message", HeaderValue::from_static(message));
        }
        encode_trailers(&map)
    }

    struct Deny;

    impl Interceptor for Deny {
        fn intercept(&self, _request: &mut RpcRequest) -> Result<()> {
            Err(Error::Unauthenticated)
        }
    }

    #[tokio::test]
    async fn unary_decodes_single_message() -> Result<()> {
        let transport = Arc::new(Scripted {
            chunks: vec![encode_message(&account()), trailers("0", None)],
            seen: Mutex::new(Vec::new()),
        });
        let channel = Channel::new("mine.MinePrivateService", transport.clone())
            .with_timeout(Duration::from_secs(5));

        let response: GetAccountResponse =
            channel.unary("GetAccount", &GetAccountRequest {}).await?;
        assert_eq!(response, account());

        let seen = transport.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "/mine.MinePrivateService/GetAccount");
        assert_eq!(seen[0].timeout, Some(Duration::from_secs(5)));
        Ok(())
    }

    #[tokio::test]
    async fn unary_reports_trailer_status() {
        let transport = Arc::new(Scripted {
            chunks: vec![trailers("5", Some("Not%20found"))],
            seen: Mutex::new(Vec::new()),
        });
        let channel = Channel::new("mine.MinePrivateService", transport);

        let err = channel
            .unary::<_, GetAccountResponse>("GetAccount", &GetAccountRequest {})
            .await
            .unwrap_err();
        match err {
            Error::Status { code, message } => {
                assert_eq!(code, Code::NotFound);
                assert_eq!(message, "Not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn unary_without_message_is_protocol_error() {
        let transport = Arc::new(Scripted {
            chunks: vec![trailers("0", None)],
            seen: Mutex::new(Vec::new()),
        });
        let channel = Channel::new("mine.MinePrivateService", transport);

        let err = channel
            .unary::<_, GetAccountResponse>("GetAccount", &GetAccountRequest {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn failing_interceptor_skips_network() {
        let transport = Arc::new(Scripted {
            chunks: vec![encode_message(&account())],
            seen: Mutex::new(Vec::new()),
        });
        let channel =
            Channel::new("mine.MinePrivateService", transport.clone()).with_interceptor(Deny);

        let err = channel
            .unary::<_, GetAccountResponse>("GetAccount", &GetAccountRequest {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        assert!(transport.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn streaming_yields_messages_then_trailer_error() {
        let transport = Arc::new(Scripted {
            chunks: vec![
                encode_message(&account()),
                encode_message(&account()),
                trailers("14", Some("Server%20restarting")),
            ],
            seen: Mutex::new(Vec::new()),
        });
        let channel = Channel::new("mine.MinePrivateService", transport);

        let stream = channel
            .server_streaming::<_, GetAccountResponse>("GetAccount", &GetAccountRequest {})
            .await
            .expect("stream opens");
        let items: Vec<Result<GetAccountResponse>> = stream.collect().await;

        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(matches!(
            &items[2],
            Err(Error::Status {
                code: Code::Unavailable,
                message,
            }) if message == "Server restarting"
        ));
    }
}
