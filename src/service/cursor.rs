//! Pagination cursor codec: store continuation key <-> opaque `next_key` string.

use crate::error::CursorError;
use crate::schema::{AttributeValue, Item};
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Key attributes of the last item a bounded query/scan returned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaginationCursor(pub Item);

impl PaginationCursor {
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }
}

impl From<Item> for PaginationCursor {
    fn from(item: Item) -> Self {
        PaginationCursor(item)
    }
}

pub struct CursorCodec;

impl CursorCodec {
    /// JSON with sorted keys (`Item` is ordered), then URL-safe base64 without padding.
    pub fn encode(cursor: Option<&PaginationCursor>) -> Result<Option<String>, CursorError> {
        let Some(cursor) = cursor else {
            return Ok(None);
        };
        let json = serde_json::to_vec(cursor)?;
        Ok(Some(URL_SAFE_NO_PAD.encode(json)))
    }

    /// Accepts URL-safe or standard alphabets, padded or not.
    pub fn decode(token: Option<&str>) -> Result<Option<PaginationCursor>, CursorError> {
        let Some(token) = token else {
            return Ok(None);
        };
        let token = token.trim();
        if token.is_empty() {
            return Err(CursorError::Empty);
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .or_else(|_| URL_SAFE.decode(token))
            .or_else(|_| STANDARD.decode(token))?;
        let text = String::from_utf8(bytes)?;
        let cursor: PaginationCursor = serde_json::from_str(&text)?;
        Ok(Some(cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> PaginationCursor {
        let mut item = Item::new();
        item.insert("id".into(), AttributeValue::S("abc".into()));
        item.insert("extension".into(), AttributeValue::S("notes".into()));
        item.insert("created_at".into(), AttributeValue::S("2024-01-01T00:00:00.000000+0000".into()));
        item.insert("rank".into(), AttributeValue::N("12".into()));
        PaginationCursor(item)
    }

    #[test]
    fn test_none_in_none_out() {
        assert_eq!(CursorCodec::encode(None).unwrap(), None);
        assert_eq!(CursorCodec::decode(None).unwrap(), None);
    }

    #[test]
    fn test_round_trip() {
        let c = cursor();
        let token = CursorCodec::encode(Some(&c)).unwrap().unwrap();
        assert!(token.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
        assert_eq!(CursorCodec::decode(Some(&token)).unwrap(), Some(c));
    }

    #[test]
    fn test_encoding_is_deterministic_and_sorted() {
        let token = CursorCodec::encode(Some(&cursor())).unwrap().unwrap();
        let json = String::from_utf8(URL_SAFE_NO_PAD.decode(&token).unwrap()).unwrap();
        assert!(json.starts_with(r#"{"created_at":{"S":"#));
        assert_eq!(token, CursorCodec::encode(Some(&cursor())).unwrap().unwrap());
    }

    #[test]
    fn test_standard_base64_accepted() {
        let json = r#"{"id":{"S":"x"}}"#;
        let token = STANDARD.encode(json);
        let decoded = CursorCodec::decode(Some(&token)).unwrap().unwrap();
        assert_eq!(decoded.get("id"), Some(&AttributeValue::S("x".into())));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(matches!(CursorCodec::decode(Some("%%%")), Err(CursorError::Encoding(_))));
        let not_json = URL_SAFE_NO_PAD.encode("hello");
        assert!(matches!(CursorCodec::decode(Some(&not_json)), Err(CursorError::Json(_))));
        let wrong_shape = URL_SAFE_NO_PAD.encode(r#"{"id":"plain"}"#);
        assert!(matches!(CursorCodec::decode(Some(&wrong_shape)), Err(CursorError::Json(_))));
        let bad_utf8 = URL_SAFE_NO_PAD.encode([0xffu8, 0xfe]);
        assert!(matches!(CursorCodec::decode(Some(&bad_utf8)), Err(CursorError::Utf8(_))));
        assert!(matches!(CursorCodec::decode(Some("")), Err(CursorError::Empty)));
    }
}
