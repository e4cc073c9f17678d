use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    FileId, InputFile, InputMedia, InputMediaPhoto, MessageId, ReplyParameters,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::bot::FrameBot;
use crate::frame_api::Frame;
use crate::platform::{AttachmentFetcher, IncomingMessage, MessageBody, Replier};

/// Sends replies into the chat of the message being handled.
struct TelegramReplier {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

#[async_trait]
impl Replier for TelegramReplier {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.chat_id, text)
            .await
            .context("Failed to send message")?;
        Ok(())
    }

    async fn send_frames(&self, frames: Vec<Frame>, reply_to_message: bool) -> Result<()> {
        let reply = reply_to_message.then(|| ReplyParameters::new(self.message_id));

        match plan_delivery(frames) {
            None => Ok(()),
            Some(Delivery::Single(frame)) => {
                let mut request = self
                    .bot
                    .send_photo(self.chat_id, InputFile::memory(frame.image))
                    .caption(frame.subtitle);
                if let Some(reply) = reply {
                    request = request.reply_parameters(reply);
                }
                request.await.context("Failed to send photo")?;
                Ok(())
            }
            Some(Delivery::Group(frames)) => {
                let mut request = self.bot.send_media_group(self.chat_id, media_group(frames));
                if let Some(reply) = reply {
                    request = request.reply_parameters(reply);
                }
                request.await.context("Failed to send media group")?;
                Ok(())
            }
        }
    }
}

/// How a batch of frames goes out.
#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Single(Frame),
    Group(Vec<Frame>),
}

/// Media groups need at least two items, so a lone frame is sent as a photo.
fn plan_delivery(frames: Vec<Frame>) -> Option<Delivery> {
    match frames.len() {
        0 => None,
        1 => frames.into_iter().next().map(Delivery::Single),
        _ => Some(Delivery::Group(frames)),
    }
}

fn media_group(frames: Vec<Frame>) -> Vec<InputMedia> {
    frames
        .into_iter()
        .map(|frame| {
            InputMedia::Photo(
                InputMediaPhoto::new(InputFile::memory(frame.image)).caption(frame.subtitle),
            )
        })
        .collect()
}

struct TelegramFetcher {
    bot: Bot,
}

#[async_trait]
impl AttachmentFetcher for TelegramFetcher {
    async fn download(&self, file_id: &str, dest: &Path) -> Result<()> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .context("Failed to look up Telegram file")?;

        let mut dst = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        self.bot
            .download_file(&file.path, &mut dst)
            .await
            .context("Failed to download Telegram file")?;
        dst.flush()
            .await
            .with_context(|| format!("Failed to flush {}", dest.display()))?;

        debug!("Downloaded {} bytes to {}", file.size, dest.display());
        Ok(())
    }
}

/// Run the Telegram bot platform until interrupted
pub async fn run(frame_bot: Arc<FrameBot>, bot: Bot) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![frame_bot])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Telegram platform stopped");
    Ok(())
}

/// Map a Telegram message onto the platform-neutral body, if it is one we handle.
fn message_body(msg: &Message) -> Option<MessageBody> {
    let caption = msg.caption().map(ToString::to_string);

    if let Some(photos) = msg.photo() {
        let photo = photos.last()?;
        return Some(MessageBody::Photo {
            file_id: photo.file.id.to_string(),
            caption,
        });
    }

    if let Some(doc) = msg.document() {
        let is_image = doc
            .mime_type
            .as_ref()
            .is_some_and(|m| m.type_() == "image");
        if !is_image {
            return None;
        }
        return Some(MessageBody::Document {
            file_id: doc.file.id.to_string(),
            file_name: doc.file_name.clone(),
            caption,
            size: doc.file.size,
        });
    }

    msg.text().map(|t| MessageBody::Text(t.to_string()))
}

async fn handle_message(bot: Bot, msg: Message, frame_bot: Arc<FrameBot>) -> ResponseResult<()> {
    let Some(body) = message_body(&msg) else {
        return Ok(());
    };

    let incoming = IncomingMessage {
        platform: "telegram".to_string(),
        chat_id: msg.chat.id.0.to_string(),
        user_name: msg
            .from
            .as_ref()
            .map(|u| u.first_name.clone())
            .unwrap_or_default(),
        body,
    };

    let replier = TelegramReplier {
        bot: bot.clone(),
        chat_id: msg.chat.id,
        message_id: msg.id,
    };
    let fetcher = TelegramFetcher { bot };

    // A failed update is logged and dropped; the dispatcher keeps polling
    if let Err(e) = frame_bot.handle(&incoming, &replier, &fetcher).await {
        error!("Error handling message in chat {}: {:#}", incoming.chat_id, e);
    }

    Ok(())
}
