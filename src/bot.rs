use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::command::{self, Command, CountError, Parsed};
use crate::config::BotConfig;
use crate::frame_api::{FrameApiClient, QueryMode, UploadOutcome};
use crate::paths::{escape_path, PendingUpload};
use crate::platform::{AttachmentFetcher, IncomingMessage, MessageBody, Replier};

pub const HELP_TEXT: &str = "\
I am a bot that can get frames you want from an anime with the text you provide.
Here are the commands you can use:
/help - Shows help message
/start - Starts the bot
/frame {query} {N} - Gets N (in range [1, 10], default: 1) frames with similar subtitle as the query
/random {N} - Gets random N (in range [1, 10], default: 1) frames

You can also send me an image and I will upload it to the server,
but be sure to provide a caption for the image if you upload it with compression.";

pub const START_TEXT: &str = "I'm a bot, please talk to me!";
pub const MISSING_QUERY_TEXT: &str = "Please provide a text to frame like this: /frame {text}";
pub const INVALID_COUNT_TEXT: &str = "Please provide a valid frame number.";
pub const NO_FRAME_TEXT: &str = "Sorry, I'm unable to find any frame.";
pub const MISSING_CAPTION_TEXT: &str = "Please provide a caption for the image";
pub const UPLOAD_FAILED_TEXT: &str = "Failed to upload due to an internal error.";

const DEFAULT_COUNT: u32 = 1;
const IMAGE_EXTENSION: &str = ".jpg";
const FALLBACK_FILE_NAME: &str = "image.jpg";

/// The frame API refuses request bodies larger than this.
const MAX_UPLOAD_BYTES: u32 = 10 * 1024 * 1024;

/// Routes incoming messages to frame lookups and uploads.
///
/// Holds no per-chat state; every message is handled on its own.
pub struct FrameBot {
    config: BotConfig,
    api: FrameApiClient,
}

impl FrameBot {
    pub fn new(config: BotConfig, api: FrameApiClient) -> Self {
        Self { config, api }
    }

    pub async fn handle(
        &self,
        incoming: &IncomingMessage,
        replier: &dyn Replier,
        fetcher: &dyn AttachmentFetcher,
    ) -> Result<()> {
        info!(
            "{} message from {} in chat {}: {}",
            incoming.platform,
            incoming.user_name,
            incoming.chat_id,
            incoming.body.summary()
        );

        match &incoming.body {
            MessageBody::Text(text) => self.handle_text(text, replier).await,
            MessageBody::Photo { file_id, caption } => {
                self.handle_photo(file_id, caption.as_deref(), replier, fetcher)
                    .await
            }
            MessageBody::Document {
                file_id,
                file_name,
                caption,
                size,
            } => {
                self.handle_document(
                    file_id,
                    file_name.as_deref(),
                    caption.as_deref(),
                    *size,
                    replier,
                    fetcher,
                )
                .await
            }
        }
    }

    async fn handle_text(&self, text: &str, replier: &dyn Replier) -> Result<()> {
        match command::parse(text, self.config.username()) {
            Parsed::Command(cmd) => self.handle_command(cmd, text, replier).await,
            Parsed::ForeignCommand => {
                debug!("Ignoring command addressed to another bot: {}", text);
                Ok(())
            }
            Parsed::Text(text) => self.smart_reply(&text, replier).await,
        }
    }

    async fn handle_command(&self, cmd: Command, text: &str, replier: &dyn Replier) -> Result<()> {
        match cmd.name.as_str() {
            "help" => replier.send_text(HELP_TEXT).await,
            "start" => replier.send_text(START_TEXT).await,
            "frame" => {
                let Some(query) = cmd.args.first() else {
                    return replier.send_text(MISSING_QUERY_TEXT).await;
                };
                let Some(count) = self.count_arg(cmd.args.get(1), replier).await? else {
                    return Ok(());
                };
                self.send_frames(QueryMode::Fuzzy(query.clone()), count, "/frame", replier)
                    .await
            }
            "random" => {
                let Some(count) = self.count_arg(cmd.args.first(), replier).await? else {
                    return Ok(());
                };
                self.send_frames(QueryMode::Random, count, "/random", replier)
                    .await
            }
            _ => self.smart_reply(text, replier).await,
        }
    }

    /// Validate an optional count argument, replying to the user when it is bad.
    async fn count_arg(&self, raw: Option<&String>, replier: &dyn Replier) -> Result<Option<u32>> {
        let Some(raw) = raw else {
            return Ok(Some(DEFAULT_COUNT));
        };

        match command::parse_count(raw, self.config.max_frames) {
            Ok(count) => Ok(Some(count)),
            Err(CountError::Invalid) => {
                replier.send_text(INVALID_COUNT_TEXT).await?;
                Ok(None)
            }
            Err(CountError::TooMany) => {
                replier
                    .send_text(&format!(
                        "I can only provide at most {} frames at once.",
                        self.config.max_frames
                    ))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn send_frames(
        &self,
        mode: QueryMode,
        count: u32,
        label: &str,
        replier: &dyn Replier,
    ) -> Result<()> {
        match self.api.query(&mode, count).await {
            Ok(frames) if !frames.is_empty() => {
                info!("{}: sending {} frame(s)", label, frames.len());
                match replier.send_frames(frames, false).await {
                    Ok(()) => return Ok(()),
                    Err(e) => error!("{}: sending frames failed: {:#}", label, e),
                }
            }
            Ok(_) => debug!("{}: no frames found", label),
            Err(e) => error!("{} failed: {:#}", label, e),
        }

        replier.send_text(NO_FRAME_TEXT).await
    }

    /// Reply with an exactly matching frame, or stay silent.
    async fn smart_reply(&self, text: &str, replier: &dyn Replier) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let frames = match self.api.query(&QueryMode::Exact(text.to_string()), 1).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Smart reply failed: {:#}", e);
                return Ok(());
            }
        };

        if frames.is_empty() {
            return Ok(());
        }

        if let Err(e) = replier.send_frames(frames, true).await {
            warn!("Smart reply failed: {:#}", e);
        }
        Ok(())
    }

    async fn handle_photo(
        &self,
        file_id: &str,
        caption: Option<&str>,
        replier: &dyn Replier,
        fetcher: &dyn AttachmentFetcher,
    ) -> Result<()> {
        let Some(caption) = caption.filter(|c| !c.is_empty()) else {
            return replier.send_text(MISSING_CAPTION_TEXT).await;
        };

        let file_name = format!("{}{}", escape_path(caption), IMAGE_EXTENSION);
        self.upload(file_id, &file_name, replier, fetcher).await
    }

    async fn handle_document(
        &self,
        file_id: &str,
        file_name: Option<&str>,
        caption: Option<&str>,
        size: u32,
        replier: &dyn Replier,
        fetcher: &dyn AttachmentFetcher,
    ) -> Result<()> {
        if size > MAX_UPLOAD_BYTES {
            return replier
                .send_text("The image is too large, the limit is 10 MB.")
                .await;
        }

        let raw_name = match caption.filter(|c| !c.is_empty()) {
            Some(caption) => format!("{}{}", caption, IMAGE_EXTENSION),
            None => file_name.unwrap_or(FALLBACK_FILE_NAME).to_string(),
        };
        let mut file_name = escape_path(&raw_name);
        if file_name.is_empty() {
            file_name = FALLBACK_FILE_NAME.to_string();
        }

        self.upload(file_id, &file_name, replier, fetcher).await
    }

    /// Persist the attachment, push it to the frame API and report back.
    ///
    /// The temp file is gone by the time the reply is sent, whatever the outcome.
    async fn upload(
        &self,
        file_id: &str,
        file_name: &str,
        replier: &dyn Replier,
        fetcher: &dyn AttachmentFetcher,
    ) -> Result<()> {
        let pending = PendingUpload::create(&self.config.tmp_dir, file_name).await?;
        fetcher.download(file_id, pending.path()).await?;

        let outcome = self.api.upload(pending.path(), pending.file_name()).await;
        drop(pending);

        match outcome? {
            UploadOutcome::Created => {
                info!("Uploaded {}", file_name);
                replier
                    .send_text(&format!("Image {} uploaded successfully", file_name))
                    .await
            }
            UploadOutcome::Rejected { status, body } => {
                warn!("Frame API rejected {} ({}): {}", file_name, status, body);
                replier
                    .send_text(&format!("Failed to upload image: {}", body))
                    .await
            }
            UploadOutcome::Failed(e) => {
                error!("Upload of {} failed: {:#}", file_name, e);
                replier.send_text(UPLOAD_FAILED_TEXT).await
            }
        }
    }
}
