// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload validation for untrusted guest input.
//!
//! Runs before any rate counter is charged, so malformed input is rejected
//! without consuming the sender's quota.

use guestlink_core::GuestlinkError;

/// Reject empty, oversized, or control-character-laden message content.
///
/// Newlines, carriage returns, and tabs are ordinary chat formatting; every
/// other control character is rejected.
pub fn validate_message(content: &str, max_bytes: usize) -> Result<(), GuestlinkError> {
    if content.trim().is_empty() {
        return Err(GuestlinkError::Validation("message is empty".to_string()));
    }
    if content.len() > max_bytes {
        return Err(GuestlinkError::Validation(format!(
            "message exceeds {max_bytes} bytes"
        )));
    }
    if content
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(GuestlinkError::Validation(
            "message contains disallowed control characters".to_string(),
        ));
    }
    Ok(())
}

/// Check an attachment's declared media type against the allow-list.
///
/// Matching is case-insensitive on the type itself; parameters after `;`
/// are ignored.
pub fn validate_attachment_type(
    media_type: &str,
    allowed: &[String],
) -> Result<(), GuestlinkError> {
    let bare = media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
        .to_ascii_lowercase();
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(&bare)) {
        Ok(())
    } else {
        Err(GuestlinkError::Validation(format!(
            "attachment type '{bare}' is not allowed"
        )))
    }
}

/// Check whether a request origin satisfies a link's origin allow-list.
///
/// `allowed_origins` is the link's stored JSON array; an absent or empty
/// list admits every origin. Comparison is case-insensitive and ignores a
/// trailing slash.
pub fn origin_allowed(allowed_origins: Option<&str>, origin: Option<&str>) -> bool {
    let Some(raw) = allowed_origins else {
        return true;
    };
    let Ok(list) = serde_json::from_str::<Vec<String>>(raw) else {
        // An unparseable allow-list admits nothing.
        return false;
    };
    if list.is_empty() {
        return true;
    }
    let Some(origin) = origin else {
        return false;
    };
    let origin = origin.trim_end_matches('/');
    list.iter()
        .any(|a| a.trim_end_matches('/').eq_ignore_ascii_case(origin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_chat_text() {
        validate_message("Hello!\nHow are you?\tFine.", 1024).unwrap();
    }

    #[test]
    fn rejects_empty_and_whitespace_only() {
        assert!(validate_message("", 1024).is_err());
        assert!(validate_message("   \n\t ", 1024).is_err());
    }

    #[test]
    fn rejects_oversized_content() {
        let big = "x".repeat(2049);
        assert!(validate_message(&big, 2048).is_err());
        let exact = "x".repeat(2048);
        validate_message(&exact, 2048).unwrap();
    }

    #[test]
    fn rejects_control_characters() {
        assert!(validate_message("null byte \u{0} here", 1024).is_err());
        assert!(validate_message("escape \u{1b}[31m", 1024).is_err());
    }

    #[test]
    fn attachment_allow_list_is_case_insensitive() {
        let allowed = vec!["image/png".to_string(), "text/plain".to_string()];
        validate_attachment_type("IMAGE/PNG", &allowed).unwrap();
        validate_attachment_type("text/plain; charset=utf-8", &allowed).unwrap();
        assert!(validate_attachment_type("application/x-sh", &allowed).is_err());
    }

    #[test]
    fn absent_origin_list_admits_everyone() {
        assert!(origin_allowed(None, None));
        assert!(origin_allowed(None, Some("https://example.com")));
        assert!(origin_allowed(Some("[]"), None));
    }

    #[test]
    fn origin_list_is_enforced() {
        let list = r#"["https://example.com", "https://app.example.com"]"#;
        assert!(origin_allowed(Some(list), Some("https://example.com")));
        assert!(origin_allowed(Some(list), Some("https://EXAMPLE.com/")));
        assert!(!origin_allowed(Some(list), Some("https://evil.example.net")));
        assert!(!origin_allowed(Some(list), None));
    }

    #[test]
    fn unparseable_origin_list_admits_nothing() {
        assert!(!origin_allowed(Some("not json"), Some("https://example.com")));
    }
}
