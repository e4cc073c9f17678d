pub mod telegram;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::frame_api::Frame;

/// A message received from any platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform identifier (e.g., "telegram")
    pub platform: String,
    /// Platform-specific chat/channel ID as string
    pub chat_id: String,
    /// Display name of the sender, empty for anonymous channel posts
    pub user_name: String,
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    /// A compressed photo; `file_id` points at the largest size variant.
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    /// An uncompressed image sent as a file.
    Document {
        file_id: String,
        file_name: Option<String>,
        caption: Option<String>,
        size: u32,
    },
}

impl MessageBody {
    /// Short description for logs.
    pub fn summary(&self) -> String {
        match self {
            MessageBody::Text(text) => text.clone(),
            MessageBody::Photo { caption, .. } => {
                format!("<photo> {}", caption.as_deref().unwrap_or_default())
            }
            MessageBody::Document {
                file_name, size, ..
            } => format!(
                "<document {} ({} bytes)>",
                file_name.as_deref().unwrap_or("unnamed"),
                size
            ),
        }
    }
}

/// Outbound side of a conversation, bound to the chat and message being handled.
#[async_trait]
pub trait Replier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Send frames as one grouped message, optionally as a reply to the
    /// message being handled.
    async fn send_frames(&self, frames: Vec<Frame>, reply_to_message: bool) -> Result<()>;
}

/// Fetches a platform-hosted attachment to the local filesystem.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn download(&self, file_id: &str, dest: &Path) -> Result<()>;
}
