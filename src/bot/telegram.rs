use std::sync::Arc;

use teloxide::net::Download;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, PhotoSize};
use tracing::{error, info, warn};

use crate::bot::client::PredictionBackend;
use crate::bot::reply;
use crate::error::{AgriError, Result};
use crate::labels::Variant;

/// Filename the API sees for every relayed photo.
pub const UPLOAD_NAME: &str = "image.jpg";

/// Long-polling Telegram front end for the detection API.
pub struct TelegramRelay {
    bot: Bot,
    backend: Arc<dyn PredictionBackend>,
    variant: Variant,
}

impl TelegramRelay {
    pub fn new(token: String, backend: Arc<dyn PredictionBackend>, variant: Variant) -> Self {
        Self {
            bot: Bot::new(token),
            backend,
            variant,
        }
    }

    /// Poll for updates until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        info!(
            "Telegram relay started for {} detection, forwarding to {}",
            self.variant,
            self.backend.endpoint()
        );

        let handler = Update::filter_message().endpoint(handle_message);

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.backend.clone(), self.variant])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram relay stopped");
        Ok(())
    }
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    backend: Arc<dyn PredictionBackend>,
    variant: Variant,
) -> ResponseResult<()> {
    if msg.text().is_some_and(is_start_command) {
        let name = msg.from.as_ref().map(|u| u.first_name.as_str());
        bot.send_message(msg.chat.id, reply::welcome(name, variant))
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    let Some(photos) = msg.photo() else {
        return Ok(());
    };
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(photo) = largest(photos) else {
        return Ok(());
    };

    info!(chat_id = %msg.chat.id, "Received photo");
    bot.send_message(msg.chat.id, reply::ANALYZING).await?;

    let text = match relay_photo(&bot, photo, backend.as_ref()).await {
        Ok(resp) => reply::format_prediction(&resp, variant),
        Err(e) => {
            match &e {
                AgriError::BackendUnreachable { url } => warn!("ML API unreachable at {}", url),
                other => error!("An error occurred during prediction: {}", other),
            }
            reply::format_error(&e)
        }
    };

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn relay_photo(
    bot: &Bot,
    photo: &PhotoSize,
    backend: &dyn PredictionBackend,
) -> Result<crate::api::types::PredictResponse> {
    let file = bot
        .get_file(photo.file.id.clone())
        .await
        .map_err(|e| AgriError::Telegram(format!("get_file failed: {e}")))?;

    let mut bytes = Vec::with_capacity(file.size as usize);
    bot.download_file(&file.path, &mut bytes)
        .await
        .map_err(|e| AgriError::Telegram(format!("download failed: {e}")))?;

    info!("Sending image to ML API at {}", backend.endpoint());
    backend.predict(bytes, UPLOAD_NAME).await
}

fn is_start_command(text: &str) -> bool {
    // also matches "/start@SomeBot" and deep-link payloads
    text.split_whitespace()
        .next()
        .and_then(|cmd| cmd.split('@').next())
        == Some("/start")
}

fn largest(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos
        .iter()
        .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
}
