//! Decoding of the `utmp` form field into session entries

use crate::db::utmp::SessionEntry;
use crate::error::{CoreError, Result};

/// Decode the raw `utmp` field.
///
/// A missing field is `NoData`; anything that is not a JSON array of
/// complete session objects is `MalformedPayload`. An empty array is valid.
pub fn decode(raw: Option<&str>) -> Result<Vec<SessionEntry>> {
    let raw = raw.ok_or(CoreError::NoData)?;
    serde_json::from_str(raw).map_err(|e| CoreError::MalformedPayload(e.to_string()))
}

/// Like [`decode`], but an empty array is also rejected as `NoData`
pub fn decode_non_empty(raw: Option<&str>) -> Result<Vec<SessionEntry>> {
    let entries = decode(raw)?;
    if entries.is_empty() {
        return Err(CoreError::NoData);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = r#"[{"user":"alice","uid":1000,"host":"client1","line":"pts/0","time":1000}]"#;

    #[test]
    fn test_decode_entries() {
        let entries = decode(Some(ONE)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user, "alice");
        assert_eq!(entries[0].rhost, "client1");
    }

    #[test]
    fn test_missing_field_is_no_data() {
        assert!(matches!(decode(None), Err(CoreError::NoData)));
    }

    #[test]
    fn test_empty_array() {
        assert!(decode(Some("[]")).unwrap().is_empty());
        assert!(matches!(decode_non_empty(Some("[]")), Err(CoreError::NoData)));
    }

    #[test]
    fn test_malformed_inputs() {
        for raw in [
            "",
            "not json",
            "null",
            "{}",
            r#"[{"user":"alice","uid":1000,"line":"pts/0","time":1000}]"#,
            r#"[{"user":"alice","uid":"x","host":"c","line":"pts/0","time":1000}]"#,
        ] {
            let err = decode(Some(raw)).unwrap_err();
            assert!(
                matches!(err, CoreError::MalformedPayload(_)),
                "expected malformed payload for {:?}, got {:?}",
                raw,
                err
            );
            assert!(err.is_payload_error());
        }
    }
}
