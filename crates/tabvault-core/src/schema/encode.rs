//! Column encodings for structured tab fields.
//!
//! Tuning and contributor lists are stored as JSON text.

use crate::error::Result;
use crate::model::Tuning;

/// Encode a tuning; an empty tuning becomes `{}`, never `null`.
pub fn encode_tuning(tuning: &Tuning) -> Result<String> {
    Ok(serde_json::to_string(tuning)?)
}

/// Decode a stored tuning. Unreadable values (including `null`) decode to
/// an empty tuning.
pub fn decode_tuning(raw: &str) -> Tuning {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        log::debug!("Unreadable tuning column {raw:?}: {e}");
        Tuning::default()
    })
}

pub fn encode_contributors(contributors: &[String]) -> Result<String> {
    Ok(serde_json::to_string(contributors)?)
}

pub fn decode_contributors(raw: &str) -> serde_json::Result<Vec<String>> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_round_trip() {
        let tuning = Tuning::new("Drop D", "D A D G B E");
        let raw = encode_tuning(&tuning).unwrap();
        assert_eq!(decode_tuning(&raw), tuning);
    }

    #[test]
    fn test_empty_tuning_encodes_as_empty_object() {
        let raw = encode_tuning(&Tuning::default()).unwrap();
        assert_eq!(raw, "{}");
        assert!(decode_tuning(&raw).is_empty());
    }

    #[test]
    fn test_null_tuning_decodes_empty() {
        assert!(decode_tuning("null").is_empty());
        assert!(decode_tuning("").is_empty());
    }

    #[test]
    fn test_contributors_keep_order() {
        let names = vec!["zed".to_string(), "alice".to_string(), "mo".to_string()];
        let raw = encode_contributors(&names).unwrap();
        assert_eq!(decode_contributors(&raw).unwrap(), names);
    }
}
