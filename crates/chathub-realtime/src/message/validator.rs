//! Message validation rules.

use crate::error::SyncError;

/// Maximum accepted WebSocket text frame in bytes.
pub const MAX_FRAME_SIZE: usize = 65_536;

/// Validates chat content: non-blank and at most `max_chars` code points.
pub fn validate_content(content: &str, max_chars: usize) -> Result<(), SyncError> {
    if content.trim().is_empty() {
        return Err(SyncError::InvalidMessage("message is empty".to_string()));
    }

    let chars = content.chars().count();
    if chars > max_chars {
        return Err(SyncError::InvalidMessage(format!(
            "message is {chars} characters, maximum is {max_chars}"
        )));
    }

    Ok(())
}

/// Validates a raw inbound frame before parsing.
pub fn validate_frame(raw: &str) -> Result<(), SyncError> {
    if raw.len() > MAX_FRAME_SIZE {
        return Err(SyncError::InvalidMessage(format!(
            "frame exceeds maximum size of {MAX_FRAME_SIZE} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(SyncError::InvalidMessage("empty frame".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_limits() {
        assert!(validate_content("hi", 2000).is_ok());
        assert!(validate_content("", 2000).is_err());
        assert!(validate_content(" \n\t", 2000).is_err());
        assert!(validate_content(&"x".repeat(2000), 2000).is_ok());
        assert!(validate_content(&"x".repeat(2001), 2000).is_err());
        assert!(validate_content("日本語", 3).is_ok());
    }

    #[test]
    fn test_frame_limits() {
        assert!(validate_frame(r#"{"type":"get-messages"}"#).is_ok());
        assert!(validate_frame("   ").is_err());
        assert!(validate_frame(&"a".repeat(MAX_FRAME_SIZE + 1)).is_err());
    }
}
