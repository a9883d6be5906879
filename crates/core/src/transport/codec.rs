use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

/// Content type used for every call.
pub const GRPC_WEB_CONTENT_TYPE: &str = "application/grpc-web+proto";

const HEADER_LEN: usize = 5;
const TRAILER_FLAG: u8 = 0x80;
const COMPRESSED_FLAG: u8 = 0x01;

/// A decoded gRPC-web frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Protobuf payload of one message.
    Data(Bytes),
    /// Trailing metadata closing the response.
    Trailers(HeaderMap),
}

/// Frame a message for the request body.
pub fn encode_message<M: Message>(message: &M) -> Bytes {
    let payload = message.encode_to_vec();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(0);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(&payload);
    buf.freeze()
}

/// Frame trailing metadata the way a gRPC-web server does.
pub fn encode_trailers(trailers: &HeaderMap) -> Bytes {
    let mut text = String::new();
    for (name, value) in trailers {
        text.push_str(name.as_str());
        text.push_str(": ");
        text.push_str(&String::from_utf8_lossy(value.as_bytes()));
        text.push_str("\r\n");
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + text.len());
    buf.put_u8(TRAILER_FLAG);
    buf.put_u32(text.len() as u32);
    buf.put_slice(text.as_bytes());
    buf.freeze()
}

/// Incremental decoder fed with body chunks as they arrive.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    /// Decoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk received from the network.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// True when no partial frame is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Pop the next complete frame, or `None` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let flags = self.buf[0];
        let len = u32::from_be_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]) as usize;
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        if flags & COMPRESSED_FLAG != 0 {
            return Err(Error::Protocol(
                "compressed frames are not supported".to_string(),
            ));
        }

        self.buf.advance(HEADER_LEN);
        let payload = self.buf.split_to(len).freeze();

        if flags & TRAILER_FLAG != 0 {
            Ok(Some(Frame::Trailers(parse_trailers(&payload)?)))
        } else {
            Ok(Some(Frame::Data(payload)))
        }
    }
}

fn parse_trailers(payload: &[u8]) -> Result<HeaderMap> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::Protocol("trailers are not valid UTF-8".to_string()))?;

    let mut trailers = HeaderMap::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::Protocol(format!("malformed trailer line {line:?}")))?;
        let name = HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes())
            .map_err(|_| Error::Protocol(format!("invalid trailer name {name:?}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| Error::Protocol(format!("invalid value for trailer {name}")))?;
        trailers.append(name, value);
    }

    Ok(trailers)
}
