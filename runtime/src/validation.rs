//! Input rules for posts, comments, profiles, and uploads.

use murmur_core::{FeedError, PostDraft};

/// Longest accepted post text, in bytes.
pub const MAX_POST_LEN: usize = 280;
/// Longest accepted comment text, in bytes.
pub const MAX_COMMENT_LEN: usize = 140;
/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 50;
/// Longest accepted upload file name, in bytes.
pub const MAX_FILE_NAME_LEN: usize = 128;

/// Control characters (except line feed and carriage return), non-breaking
/// and typographic spaces, zero-width and bidi formatting marks, fillers.
fn is_invisible(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{0009}'
        | '\u{000B}'..='\u{000C}'
        | '\u{000E}'..='\u{001F}'
        | '\u{00A0}'
        | '\u{115F}'
        | '\u{1160}'
        | '\u{2000}'..='\u{200D}'
        | '\u{202A}'..='\u{202F}'
        | '\u{205F}'..='\u{206F}'
        | '\u{3000}'
        | '\u{3164}'
        | '\u{FEFF}'
    )
}

/// Remove invisible characters from `text`.
#[must_use]
pub fn strip_invisible(text: &str) -> String {
    text.chars().filter(|c| !is_invisible(*c)).collect()
}

/// Normalize a post draft.
///
/// Text is stripped of invisible characters and surrounding whitespace
/// before it is checked and stored.
///
/// # Errors
///
/// Returns [`FeedError::Validation`] if the draft has neither text nor image,
/// or its text exceeds [`MAX_POST_LEN`].
pub fn post_draft(draft: PostDraft) -> Result<PostDraft, FeedError> {
    let text = strip_invisible(&draft.text).trim().to_string();
    let image = draft.image.trim().to_string();

    if text.is_empty() && image.is_empty() {
        return Err(FeedError::Validation("post cannot be empty".to_string()));
    }
    if text.len() > MAX_POST_LEN {
        return Err(FeedError::Validation(format!(
            "post length exceeds the maximum of {MAX_POST_LEN}"
        )));
    }

    Ok(PostDraft { text, image })
}

/// Normalize comment text.
///
/// # Errors
///
/// Returns [`FeedError::Validation`] if the text is empty after stripping or
/// exceeds [`MAX_COMMENT_LEN`].
pub fn comment_text(text: &str) -> Result<String, FeedError> {
    let text = strip_invisible(text).trim().to_string();

    if text.is_empty() {
        return Err(FeedError::Validation("comment cannot be empty".to_string()));
    }
    if text.len() > MAX_COMMENT_LEN {
        return Err(FeedError::Validation(format!(
            "comment length exceeds the maximum of {MAX_COMMENT_LEN}"
        )));
    }

    Ok(text)
}

/// Normalize a display name.
///
/// # Errors
///
/// Returns [`FeedError::Validation`] if the name is blank or longer than
/// [`MAX_NAME_LEN`] characters.
pub fn user_name(name: &str) -> Result<String, FeedError> {
    let name = strip_invisible(name).trim().to_string();

    if name.is_empty() {
        return Err(FeedError::Validation("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(FeedError::Validation(format!(
            "name exceeds the maximum of {MAX_NAME_LEN} characters"
        )));
    }

    Ok(name)
}

/// Reduce a client file name to a safe blob-key suffix.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`.
///
/// # Errors
///
/// Returns [`FeedError::Validation`] if nothing usable remains or the result
/// exceeds [`MAX_FILE_NAME_LEN`].
pub fn file_name(name: &str) -> Result<String, FeedError> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let base = strip_invisible(base);
    let sanitized: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        return Err(FeedError::Validation("file name is required".to_string()));
    }
    if sanitized.len() > MAX_FILE_NAME_LEN {
        return Err(FeedError::Validation(format!(
            "file name exceeds the maximum of {MAX_FILE_NAME_LEN}"
        )));
    }

    Ok(sanitized)
}

/// Check that an upload declares an image MIME type.
///
/// # Errors
///
/// Returns [`FeedError::Validation`] for anything but `image/*`.
pub fn image_type(content_type: &str) -> Result<String, FeedError> {
    let content_type = content_type.trim().to_ascii_lowercase();
    match content_type.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok(content_type),
        _ => Err(FeedError::Validation(format!(
            "unsupported file type {content_type:?}, expected image/*"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn draft(text: &str, image: &str) -> PostDraft {
        PostDraft {
            text: text.to_string(),
            image: image.to_string(),
        }
    }

    #[test]
    fn zero_width_only_post_is_empty() {
        let err = post_draft(draft("\u{200B}\u{FEFF}", "")).unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
    }

    #[test]
    fn whitespace_only_post_is_empty() {
        for text in ["   ", "\u{200B} ", " \n\r\n ", "\u{3000}\t "] {
            let err = post_draft(draft(text, "")).unwrap_err();
            assert!(matches!(err, FeedError::Validation(_)), "{text:?}");
        }
    }

    #[test]
    fn post_text_is_stored_trimmed() {
        let draft = post_draft(draft("  hello\nworld \u{200B}", "")).unwrap();
        assert_eq!(draft.text, "hello\nworld");
    }

    #[test]
    fn whitespace_only_comment_is_empty() {
        assert!(matches!(comment_text("  "), Err(FeedError::Validation(_))));
        assert!(matches!(comment_text("\n\u{FEFF} \n"), Err(FeedError::Validation(_))));
        assert_eq!(comment_text(" ok \u{200D}").unwrap(), "ok");
    }

    #[test]
    fn image_only_post_is_accepted() {
        let draft = post_draft(draft("", "cat.png")).unwrap();
        assert_eq!(draft.image, "cat.png");
        assert!(draft.text.is_empty());
    }

    #[test]
    fn newlines_survive_stripping() {
        assert_eq!(strip_invisible("a\nb\u{200D}c\td"), "a\nbcd");
    }

    #[test]
    fn post_limit_is_inclusive() {
        assert!(post_draft(draft(&"x".repeat(MAX_POST_LEN), "")).is_ok());
        assert!(post_draft(draft(&"x".repeat(MAX_POST_LEN + 1), "")).is_err());
    }

    #[test]
    fn comment_bounds() {
        assert!(comment_text("").is_err());
        assert!(comment_text(&"x".repeat(MAX_COMMENT_LEN)).is_ok());
        assert!(comment_text(&"x".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }

    #[test]
    fn user_name_is_trimmed_and_required() {
        assert_eq!(user_name("  Ada Lovelace\u{200B} ").unwrap(), "Ada Lovelace");
        assert!(matches!(user_name(" \u{3000} "), Err(FeedError::Validation(_))));
        assert!(user_name(&"é".repeat(MAX_NAME_LEN)).is_ok());
        assert!(user_name(&"é".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn file_name_keeps_only_the_base_name() {
        assert_eq!(file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(file_name("C:\\Users\\ada\\my cat.png").unwrap(), "my_cat.png");
        assert!(file_name("photos/").is_err());
        assert!(file_name("..").is_err());
        assert!(file_name(&"x".repeat(MAX_FILE_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn only_image_uploads_are_accepted() {
        assert_eq!(image_type(" Image/PNG ").unwrap(), "image/png");
        assert!(image_type("application/pdf").is_err());
        assert!(image_type("image/").is_err());
        assert!(image_type("").is_err());
    }

    proptest! {
        #[test]
        fn stripped_text_has_no_invisible_chars(text in any::<String>()) {
            prop_assert!(!strip_invisible(&text).chars().any(is_invisible));
        }

        #[test]
        fn accepted_file_names_are_key_safe(name in any::<String>()) {
            if let Ok(name) = file_name(&name) {
                prop_assert!(!name.contains('/'));
                let key_safe = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_');
                prop_assert!(name.chars().all(key_safe));
            }
        }
    }
}
