use bones_shared::constants::{MSGTYPE_IMAGE, MSGTYPE_TEXT, MXC_SCHEME};
use serde::{Deserialize, Serialize};

/// Hydrus file ids are plain integers.
pub type FileId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Other(String),
}

impl MessageType {
    pub fn from_msgtype(msgtype: &str) -> Self {
        if msgtype == MSGTYPE_TEXT {
            Self::Text
        } else {
            Self::Other(msgtype.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageContent {
    pub message_type: MessageType,
    pub body: Option<String>,
    /// Set when the message is a rich reply carrying a quoted fallback.
    pub is_reply: bool,
}

/// A room message as seen by the event filter. `content` is `None` for
/// redacted events.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub room_id: String,
    pub sender: String,
    pub content: Option<MessageContent>,
}

impl InboundMessage {
    pub fn text(room_id: &str, sender: &str, body: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            sender: sender.to_string(),
            content: Some(MessageContent {
                message_type: MessageType::Text,
                body: Some(body.to_string()),
                is_reply: false,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchFilesResponse {
    #[serde(default)]
    pub file_ids: Vec<FileId>,
}

#[derive(Debug, Deserialize)]
pub struct FileMetadataResponse {
    #[serde(default)]
    pub metadata: Vec<FileMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub hash: String,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub mime: String,
    pub ext: String,
    pub size: u64,
}

/// Where replies point: `mxc://<host>/<prefix><hash>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLocator {
    pub host: String,
    pub prefix: String,
}

impl ContentLocator {
    pub fn new(host: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            prefix: prefix.into(),
        }
    }

    pub fn locate(&self, hash: &str) -> String {
        format!("{}{}/{}{}", MXC_SCHEME, self.host, self.prefix, hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    #[serde(rename = "h", skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(rename = "w", skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    pub mimetype: String,
    pub size: u64,
}

/// `m.image` message content sent back to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyPayload {
    pub body: String,
    pub info: ImageInfo,
    pub msgtype: String,
    pub url: String,
}

impl ReplyPayload {
    pub fn image(metadata: &FileMetadata, locator: &ContentLocator) -> Self {
        Self {
            body: format!("{}{}", metadata.hash, metadata.ext),
            info: ImageInfo {
                height: metadata.height,
                width: metadata.width,
                mimetype: metadata.mime.clone(),
                size: metadata.size,
            },
            msgtype: MSGTYPE_IMAGE.to_string(),
            url: locator.locate(&metadata.hash),
        }
    }
}
