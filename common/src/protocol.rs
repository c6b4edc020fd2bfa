use crate::{
    config::{StatusFormat, MAX_TOKEN_BYTES},
    types::FanSnapshot,
};

/// One byte larger than the longest valid token so an oversized request can
/// never be truncated into a match.
pub const REQUEST_BUFFER_BYTES: usize = MAX_TOKEN_BYTES + 1;

pub const RESPONSE_BUFFER_BYTES: usize = 1024;

pub fn is_authorized(payload: &[u8], token: &str) -> bool {
    !token.is_empty() && payload == token.as_bytes()
}

pub fn encode_status(
    snapshot: &FanSnapshot,
    format: StatusFormat,
) -> Result<Vec<u8>, serde_json::Error> {
    match format {
        StatusFormat::Text => Ok(snapshot.to_string().into_bytes()),
        StatusFormat::Json => serde_json::to_vec(snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FanState;

    fn snapshot() -> FanSnapshot {
        FanSnapshot {
            pin: 12,
            temp: 52.25,
            state: FanState::Start,
            cycle: 70,
            count: 0,
        }
    }

    #[test]
    fn token_must_match_exactly() {
        assert!(is_authorized(b"s3cret", "s3cret"));
        assert!(!is_authorized(b"s3cre", "s3cret"));
        assert!(!is_authorized(b"s3cret\n", "s3cret"));
        assert!(!is_authorized(b"S3CRET", "s3cret"));
        assert!(!is_authorized(b"", ""));
    }

    #[test]
    fn text_status_carries_state_name() {
        let body = encode_status(&snapshot(), StatusFormat::Text).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("State: Start"));
        assert!(text.contains("Temp: 52.25"));
    }

    #[test]
    fn json_status_round_trips() {
        let body = encode_status(&snapshot(), StatusFormat::Json).unwrap();
        let decoded: FanSnapshot = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded, snapshot());

        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["state"], "Start");
    }
}
