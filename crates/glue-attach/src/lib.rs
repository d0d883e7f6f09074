//! GLUE-ATTACH: evidence records for the active scenario
//!
//! Running code hands text, bytes or a byte stream to the
//! [`AttachmentManager`]; the manager normalizes it into an [`Attachment`]
//! and forwards it to a sink owned by the runtime.
//!
//! # Example
//!
//! ```
//! use glue_attach::{AttachmentManager, Attachment};
//! use std::sync::{Arc, Mutex};
//!
//! let seen: Arc<Mutex<Vec<Attachment>>> = Arc::default();
//! let sink = Arc::clone(&seen);
//! let manager = AttachmentManager::new(move |a| sink.lock().unwrap().push(a));
//!
//! let task = manager.create("hello", None);
//! assert!(task.is_complete());
//! assert_eq!(seen.lock().unwrap()[0].data, "hello");
//! ```

pub mod attachment;
pub mod data;
pub mod manager;

pub use attachment::{Attachment, Encoding, Media};
pub use data::{AttachmentData, ByteStream, ACCEPTED_SHAPES};
pub use manager::{AttachmentManager, AttachmentTask, Sink};
