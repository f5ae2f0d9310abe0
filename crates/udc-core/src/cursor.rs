//! # Cursor Codec
//!
//! Pagination cursors are opaque to callers. Internally a cursor is the JSON
//! object `{"offset": n}` encoded as URL-safe base64 with the padding
//! stripped. Decoding accepts padded and unpadded input.
//!
//! A cursor is only meaningful for the filter/sort parameters that produced
//! it. Nothing checks this: replaying a cursor against other filters returns a
//! well-formed page at that offset.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

const CURSOR_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    #[serde(default)]
    offset: u64,
}

/// Encode an offset into an opaque cursor token.
pub fn encode(offset: usize) -> String {
    let payload = serde_json::json!({ "offset": offset });
    CURSOR_ENGINE.encode(payload.to_string())
}

/// Decode a cursor token back into an offset.
///
/// `None` and the empty string mean "start at the beginning". Anything else
/// must be a cursor produced by [`encode`]; otherwise the call fails with
/// [`ConnectorError::MalformedCursor`].
pub fn decode(cursor: Option<&str>) -> Result<usize, ConnectorError> {
    let token = match cursor.map(str::trim) {
        None | Some("") => return Ok(0),
        Some(token) => token,
    };

    let bytes = CURSOR_ENGINE
        .decode(token)
        .map_err(|e| ConnectorError::MalformedCursor(format!("not base64: {}", e)))?;
    let payload: CursorPayload = serde_json::from_slice(&bytes)
        .map_err(|e| ConnectorError::MalformedCursor(format!("bad payload: {}", e)))?;

    usize::try_from(payload.offset)
        .map_err(|_| ConnectorError::MalformedCursor("offset out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for n in [0usize, 1, 9, 10, 11, 255, 4096, 1_000_000] {
            assert_eq!(decode(Some(&encode(n))).unwrap(), n);
        }
    }

    #[test]
    fn test_empty_cursor_starts_at_zero() {
        assert_eq!(decode(None).unwrap(), 0);
        assert_eq!(decode(Some("")).unwrap(), 0);
        assert_eq!(decode(Some("   ")).unwrap(), 0);
    }

    #[test]
    fn test_token_is_url_safe_and_unpadded() {
        let token = encode(123_456);
        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }

    #[test]
    fn test_padded_token_still_decodes() {
        // {"offset":10} is 13 bytes, so the unpadded token is two short.
        let token = encode(10);
        let padded = format!("{}{}", token, "=".repeat((4 - token.len() % 4) % 4));
        assert!(padded.ends_with("=="));
        assert_eq!(decode(Some(&padded)).unwrap(), 10);
    }

    #[test]
    fn test_missing_offset_defaults_to_zero() {
        let token = CURSOR_ENGINE.encode("{}");
        assert_eq!(decode(Some(&token)).unwrap(), 0);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            decode(Some("not a cursor!")),
            Err(ConnectorError::MalformedCursor(_))
        ));
        let not_json = CURSOR_ENGINE.encode("offset=3");
        assert!(matches!(
            decode(Some(&not_json)),
            Err(ConnectorError::MalformedCursor(_))
        ));
        let negative = CURSOR_ENGINE.encode(r#"{"offset":-4}"#);
        assert!(matches!(
            decode(Some(&negative)),
            Err(ConnectorError::MalformedCursor(_))
        ));
    }
}
