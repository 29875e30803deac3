//! Telegram relay: forwards user photos to the detection API and replies
//! with the formatted verdict.

pub mod client;
pub mod reply;
pub mod telegram;

pub use client::{InferenceClient, PredictionBackend};
pub use telegram::TelegramRelay;
