//! Dashboard protocol: wire types, validation, and payload decoding.

pub mod model;
pub mod validate;

use sha2::{Digest, Sha256};

use crate::core::errors::{DashpadError, Result};
pub use model::{Button, Color, DashboardState, HIGHLIGHT_PALETTE, Tab, TabBody};

/// Parse a raw payload produced by a source and validate it.
///
/// `origin` describes the source for error messages (file path, command, URL).
pub fn decode_payload(text: &str, origin: &str) -> Result<DashboardState> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DashpadError::Payload {
            origin: origin.to_string(),
            details: e.to_string(),
        })?;
    validate::validate_dashboard_state(value)
}

/// Short hex digest of a payload, recorded in the activity log so operators can
/// tell whether consecutive polls changed anything.
#[must_use]
pub fn payload_digest(state: &DashboardState) -> String {
    let canonical = serde_json::to_vec(state).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_malformed_json_as_payload_error() {
        let err = decode_payload("{ not json", "status.json").unwrap_err();
        assert!(matches!(err, DashpadError::Payload { .. }));
        assert!(err.to_string().contains("status.json"));
    }

    #[test]
    fn decode_rejects_schema_mismatch_as_validation_error() {
        let err = decode_payload(r#"{"tabs": 3}"#, "status.json").unwrap_err();
        assert!(matches!(err, DashpadError::Validation { .. }));
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let empty = DashboardState::default();
        let one = decode_payload(
            r#"{"tabs":[{"color":{"type":"solid","paletteColor":1},"tabType":"list","buttons":[]}]}"#,
            "inline",
        )
        .unwrap();
        assert_eq!(payload_digest(&empty), payload_digest(&empty));
        assert_ne!(payload_digest(&empty), payload_digest(&one));
        assert_eq!(payload_digest(&one).len(), 16);
    }
}
