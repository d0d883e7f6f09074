//! The attachment wire shape: `{data, media: {type, encoding?}}`
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    #[serde(rename = "type")]
    pub media_type: String,
}

impl Media {
    pub fn plain(media_type: impl Into<String>) -> Self {
        Self {
            encoding: None,
            media_type: media_type.into(),
        }
    }

    pub fn base64(media_type: impl Into<String>) -> Self {
        Self {
            encoding: Some(Encoding::Base64),
            media_type: media_type.into(),
        }
    }
}

/// A normalized evidence record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub data: String,
    pub media: Media,
}
