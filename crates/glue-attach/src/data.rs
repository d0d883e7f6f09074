//! Accepted attachment payload shapes
use futures::stream::{self, BoxStream, Stream, StreamExt};
use glue_core::GlueError;
use serde_json::Value;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Chunks of a readable byte stream
pub type ByteStream = BoxStream<'static, std::io::Result<Vec<u8>>>;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Listed in the error for unsupported payloads
pub const ACCEPTED_SHAPES: &str = "must be bytes, a readable byte stream, or a string";

pub enum AttachmentData {
    Bytes(Vec<u8>),
    Stream(ByteStream),
    Text(String),
}

impl AttachmentData {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }

    /// Adapt any async reader into a chunked byte stream
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let chunks = stream::unfold(Some(reader), |state| async move {
            let mut reader = state?;
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            match reader.read(&mut buf).await {
                Ok(0) => None,
                Ok(n) => {
                    buf.truncate(n);
                    Some((Ok(buf), Some(reader)))
                }
                // stop after the first failure
                Err(e) => Some((Err(e), None)),
            }
        });
        Self::from_stream(chunks)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Stream(_) => "stream",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Debug for AttachmentData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

impl From<Vec<u8>> for AttachmentData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for AttachmentData {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for AttachmentData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for AttachmentData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<ByteStream> for AttachmentData {
    fn from(stream: ByteStream) -> Self {
        Self::Stream(stream)
    }
}

/// Dynamic payloads (e.g. from scripted steps): only strings are accepted
impl TryFrom<Value> for AttachmentData {
    type Error = GlueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            other => Err(GlueError::Argument(format!(
                "invalid attachment data {}: {}",
                json_kind(&other),
                ACCEPTED_SHAPES
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
