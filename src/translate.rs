//! Translation hook applied to model replies
//!
//! Replies pass through here when a target language is configured. No
//! translation backend is wired up, so the text comes back unchanged.

pub fn translate(text: &str, target_language: Option<&str>) -> String {
    if let Some(lang) = target_language {
        tracing::debug!(target_language = %lang, chars = text.len(), "Translation hook (identity)");
    }
    text.to_string()
}
