//! Pre-flight checks. A failure here means no request is sent.

use civic_types::{
    MAX_BIO_CHARS, MAX_DISPLAY_NAME_CHARS, MAX_POST_CHARS, MAX_REASON_CHARS,
    MIN_DISPLAY_NAME_CHARS,
};

use super::state::ProfileForm;

/// Limits count Unicode scalar values, same as the server.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

pub fn validate_post_content(content: &str) -> Result<(), String> {
    let count = char_count(content.trim());
    if count == 0 {
        return Err("Cannot post empty content. Type something first!".to_string());
    }
    if count > MAX_POST_CHARS {
        return Err(format!(
            "Post exceeds {} characters (current: {})",
            MAX_POST_CHARS, count
        ));
    }
    Ok(())
}

pub fn validate_reason(reason: &str) -> Result<(), String> {
    let count = char_count(reason);
    if count > MAX_REASON_CHARS {
        return Err(format!(
            "Reason exceeds {} characters (current: {})",
            MAX_REASON_CHARS, count
        ));
    }
    Ok(())
}

pub fn validate_profile(form: &ProfileForm) -> Result<(), String> {
    let name_len = char_count(&form.display_name);
    if !(MIN_DISPLAY_NAME_CHARS..=MAX_DISPLAY_NAME_CHARS).contains(&name_len) {
        return Err(format!(
            "Display name must be between {} and {} characters",
            MIN_DISPLAY_NAME_CHARS, MAX_DISPLAY_NAME_CHARS
        ));
    }
    let bio_len = char_count(&form.bio);
    if bio_len > MAX_BIO_CHARS {
        return Err(format!(
            "Bio must not exceed {} characters (current: {})",
            MAX_BIO_CHARS, bio_len
        ));
    }
    Ok(())
}
