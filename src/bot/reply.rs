//! Chat replies for the relay, rendered as Telegram HTML.

use teloxide::utils::html;

use crate::api::types::PredictResponse;
use crate::error::AgriError;
use crate::labels::Variant;

pub const ANALYZING: &str = "Analyzing image... Please wait a moment.";

pub fn welcome(user: Option<&str>, variant: Variant) -> String {
    let greeting = match user {
        Some(name) => format!("Hi {}!", html::escape(name)),
        None => "Hi!".to_string(),
    };
    let subject = match variant {
        Variant::Crop => "a crop leaf",
        Variant::Cattle => "the affected animal",
    };
    format!(
        "{greeting}\n\nI am a {} disease detection bot. Please send me a clear picture of {subject}, \
         and I will try to predict if it has a disease and recommend a treatment.",
        variant.as_str()
    )
}

/// Turn the API's answer into the message sent back to the user.
pub fn format_prediction(resp: &PredictResponse, variant: Variant) -> String {
    let detection = match (&resp.detection, resp.success) {
        (Some(d), true) => d,
        _ => {
            return format!(
                "Prediction failed in the backend: {}",
                html::escape(non_empty(&resp.message, "Unknown error"))
            )
        }
    };

    let confidence = format!("{:.2}%", detection.confidence * 100.0);
    let treatment = html::italic(&html::escape(&detection.treatment));

    if detection.detected {
        format!(
            "{}\n\n{} {}\n{} {}\n\n{}\n{}",
            html::bold("Disease Detection Result"),
            html::bold("Detected Disease:"),
            html::escape(&detection.disease),
            html::bold("Confidence:"),
            confidence,
            html::bold("Treatment Recommendation:"),
            treatment
        )
    } else {
        format!(
            "{}\n\n{} {}\n\n{}\n{}",
            html::bold(&format!("{} Status: Healthy", variant.subject())),
            html::bold("Confidence:"),
            confidence,
            html::bold("Recommendation:"),
            treatment
        )
    }
}

pub fn format_error(err: &AgriError) -> String {
    match err {
        AgriError::BackendUnreachable { url } => format!(
            "Error: Could not connect to the ML service. Please ensure the API is running at {}.",
            html::escape(url)
        ),
        other => format!(
            "An unexpected error occurred: {}",
            html::escape(&other.to_string())
        ),
    }
}

fn non_empty<'a>(s: &'a str, fallback: &'a str) -> &'a str {
    if s.trim().is_empty() {
        fallback
    } else {
        s
    }
}
