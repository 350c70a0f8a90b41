//! Prompt templates for the image-captioning call.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tweaking how images are described requires
//!    editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the rendered prompt without
//!    calling a real vision model.

/// Alt text at or below this many characters is considered insufficient and
/// triggers a captioning call; anything longer is kept verbatim.
pub const ALT_TEXT_BYPASS_LEN: usize = 50;

/// Build the captioning prompt, embedding the document author's original
/// alt text so the model can refine rather than replace it.
pub fn caption_prompt(alt_text: &str) -> String {
    let original = if alt_text.is_empty() {
        "No description provided"
    } else {
        alt_text
    };
    format!(
        "Please describe this image from documentation. Original description: {original}"
    )
}
