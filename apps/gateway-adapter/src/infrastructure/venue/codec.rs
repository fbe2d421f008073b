//! Bridge Wire Codec
//!
//! The TCP bridge speaks newline-delimited JSON. Each inbound line holds
//! either one event object or an array of them; each outbound line holds
//! one request object.
//!
//! ```json
//! {"type":"next_valid_id","order_id":1}
//! [{"type":"position","symbol":"AAPL",...},{"type":"position_end"}]
//! ```

use serde::Serialize;

use crate::application::ports::{TransportError, VenueEvent, VenueRequest};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The line held nothing to decode.
    #[error("empty frame")]
    EmptyFrame,
}

impl From<CodecError> for TransportError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Session handshake sent before any request.
#[derive(Debug, Serialize)]
struct Handshake {
    #[serde(rename = "type")]
    kind: &'static str,
    client_id: i32,
}

/// Newline-delimited JSON codec for the venue bridge.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesCodec;

impl JsonLinesCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one line into zero or more events.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is blank or not a valid event.
    pub fn decode(&self, line: &str) -> Result<Vec<VenueEvent>, CodecError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(CodecError::EmptyFrame);
        }
        if trimmed.starts_with('[') {
            Ok(serde_json::from_str(trimmed)?)
        } else {
            Ok(vec![serde_json::from_str(trimmed)?])
        }
    }

    /// Encode a request as one newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_request(&self, request: &VenueRequest) -> Result<String, CodecError> {
        Self::line(request)
    }

    /// Encode the session handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_handshake(&self, client_id: i32) -> Result<String, CodecError> {
        Self::line(&Handshake {
            kind: "hello",
            client_id,
        })
    }

    /// Encode an event as one newline-terminated line.
    ///
    /// Used by bridge-side test doubles.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_event(&self, event: &VenueEvent) -> Result<String, CodecError> {
        Self::line(event)
    }

    fn line<T: Serialize>(value: &T) -> Result<String, CodecError> {
        let mut text = serde_json::to_string(value)?;
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_single_object() {
        let codec = JsonLinesCodec::new();
        let events = codec.decode(r#"{"type":"next_valid_id","order_id":17}"#).unwrap();
        assert_eq!(events, vec![VenueEvent::NextValidId { order_id: 17 }]);
    }

    #[test]
    fn decode_array() {
        let codec = JsonLinesCodec::new();
        let line = r#"[{"type":"connect_ack"},{"type":"managed_accounts","accounts":["DU1"]}]"#;
        let events = codec.decode(line).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], VenueEvent::ConnectAck);
    }

    #[test]
    fn decode_position_with_string_decimals() {
        let codec = JsonLinesCodec::new();
        let line = r#"{"type":"position","symbol":"AAPL","quantity":"-10","avg_cost":"150.25","account":"DU1"}"#;
        let events = codec.decode(line).unwrap();
        let VenueEvent::Position(position) = &events[0] else {
            panic!("expected position, got {events:?}");
        };
        assert!(position.is_short());
    }

    #[test]
    fn decode_blank_line_is_error() {
        let codec = JsonLinesCodec::new();
        assert!(matches!(codec.decode("   \r"), Err(CodecError::EmptyFrame)));
    }

    #[test]
    fn decode_unknown_type_is_error() {
        let codec = JsonLinesCodec::new();
        assert!(matches!(
            codec.decode(r#"{"type":"tick_price"}"#),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn encode_is_newline_terminated() {
        let codec = JsonLinesCodec::new();
        let line = codec.encode_request(&VenueRequest::Positions).unwrap();
        assert_eq!(line, "{\"type\":\"positions\"}\n");

        let hello = codec.encode_handshake(7).unwrap();
        assert_eq!(hello, "{\"type\":\"hello\",\"client_id\":7}\n");
    }

    #[test]
    fn codec_error_maps_to_transport_error() {
        let err: TransportError = CodecError::EmptyFrame.into();
        assert!(matches!(err, TransportError::Codec(ref m) if m == "empty frame"));
    }
}
