//! Attachment manager
//!
//! Text and byte payloads are normalized and forwarded to the sink before
//! [`AttachmentManager::create`] returns. Streams are the one asynchronous
//! path: the returned [`AttachmentTask`] buffers the stream when awaited and
//! only then emits. Failures are reported through the task (or the callback
//! given to [`AttachmentManager::create_with_callback`]) and never reach the
//! sink.

use crate::attachment::{Attachment, Media};
use crate::data::{AttachmentData, ByteStream};
use base64::{engine::general_purpose, Engine as _};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::StreamExt;
use glue_core::{GlueConfig, GlueError, Result, DEFAULT_TEXT_MEDIA_TYPE};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Receives every successfully created attachment. Must not panic.
pub type Sink = Arc<dyn Fn(Attachment) + Send + Sync>;

#[derive(Clone)]
pub struct AttachmentManager {
    sink: Sink,
    max_stream_bytes: Option<usize>,
}

impl fmt::Debug for AttachmentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentManager")
            .field("max_stream_bytes", &self.max_stream_bytes)
            .finish_non_exhaustive()
    }
}

impl AttachmentManager {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(Attachment) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
            max_stream_bytes: None,
        }
    }

    pub fn from_config<F>(sink: F, config: &GlueConfig) -> Self
    where
        F: Fn(Attachment) + Send + Sync + 'static,
    {
        Self::new(sink).with_max_stream_bytes(config.max_attachment_stream_bytes)
    }

    /// Fail stream attachments that grow past `limit` bytes
    pub fn with_max_stream_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_stream_bytes = limit;
        self
    }

    /// Normalize `data` and emit it.
    ///
    /// Bytes and streams require a media type; text defaults to `text/plain`.
    pub fn create(&self, data: impl Into<AttachmentData>, media_type: Option<&str>) -> AttachmentTask {
        let media_type = media_type.filter(|m| !m.is_empty());
        match data.into() {
            AttachmentData::Bytes(bytes) => match media_type {
                Some(media_type) => {
                    self.emit_bytes(&bytes, media_type);
                    AttachmentTask::ready(Ok(()))
                }
                None => AttachmentTask::ready(Err(missing_media_type("bytes"))),
            },
            AttachmentData::Stream(stream) => match media_type {
                Some(media_type) => self.stream_task(stream, media_type.to_string()),
                None => AttachmentTask::ready(Err(missing_media_type("stream"))),
            },
            AttachmentData::Text(text) => {
                let media_type = media_type.unwrap_or(DEFAULT_TEXT_MEDIA_TYPE);
                self.emit(text, Media::plain(media_type));
                AttachmentTask::ready(Ok(()))
            }
        }
    }

    /// Like [`create`](Self::create) for dynamically shaped payloads
    pub fn create_value(&self, data: serde_json::Value, media_type: Option<&str>) -> AttachmentTask {
        match AttachmentData::try_from(data) {
            Ok(data) => self.create(data, media_type),
            Err(err) => AttachmentTask::ready(Err(err)),
        }
    }

    /// Report completion through `callback` instead of a future.
    ///
    /// Completed tasks call back immediately. Pending ones are spawned on the
    /// current Tokio runtime, or driven to completion on this thread when
    /// there is none.
    pub fn create_with_callback<F>(
        &self,
        data: impl Into<AttachmentData>,
        media_type: Option<&str>,
        callback: F,
    ) where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        match self.create(data, media_type).state {
            TaskState::Ready(Some(result)) => callback(result),
            state => {
                let task = AttachmentTask { state };
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move { callback(task.await) });
                    }
                    Err(_) => callback(futures::executor::block_on(task)),
                }
            }
        }
    }

    fn stream_task(&self, mut stream: ByteStream, media_type: String) -> AttachmentTask {
        let manager = self.clone();
        let future = async move {
            let mut buffer = Vec::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| {
                    tracing::warn!(error = %e, media_type = %media_type, "attachment stream failed");
                    GlueError::Stream(e.to_string())
                })?;
                buffer.extend_from_slice(&chunk);
                if let Some(limit) = manager.max_stream_bytes {
                    if buffer.len() > limit {
                        return Err(GlueError::Stream(format!(
                            "stream attachment exceeds {} bytes",
                            limit
                        )));
                    }
                }
            }
            manager.emit_bytes(&buffer, &media_type);
            Ok(())
        };
        AttachmentTask::pending(future.boxed())
    }

    fn emit_bytes(&self, bytes: &[u8], media_type: &str) {
        self.emit(general_purpose::STANDARD.encode(bytes), Media::base64(media_type));
    }

    fn emit(&self, data: String, media: Media) {
        tracing::debug!(media_type = %media.media_type, len = data.len(), "attachment created");
        (self.sink)(Attachment { data, media });
    }
}

fn missing_media_type(kind: &str) -> GlueError {
    GlueError::Argument(format!("{} attachments must specify a media type", kind))
}

/// Completion of one [`AttachmentManager::create`] call
#[must_use = "stream attachments are only buffered when the task is awaited"]
pub struct AttachmentTask {
    state: TaskState,
}

enum TaskState {
    Ready(Option<Result<()>>),
    Pending(BoxFuture<'static, Result<()>>),
}

impl AttachmentTask {
    fn ready(result: Result<()>) -> Self {
        Self {
            state: TaskState::Ready(Some(result)),
        }
    }

    fn pending(future: BoxFuture<'static, Result<()>>) -> Self {
        Self {
            state: TaskState::Pending(future),
        }
    }

    /// True when the outcome was decided synchronously
    pub fn is_complete(&self) -> bool {
        matches!(self.state, TaskState::Ready(_))
    }
}

impl fmt::Debug for AttachmentTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            TaskState::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            TaskState::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl Future for AttachmentTask {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            TaskState::Ready(result) => {
                Poll::Ready(result.take().expect("AttachmentTask polled after completion"))
            }
            TaskState::Pending(future) => future.as_mut().poll(cx),
        }
    }
}
