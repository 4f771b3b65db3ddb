use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("content is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("decoded content is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Encode file text into the transport-safe base64 form.
///
/// Never fails: `&str` is valid UTF-8 by construction and base64 accepts
/// arbitrary bytes.
pub fn encode(text: &str) -> String {
    general_purpose::STANDARD.encode(text.as_bytes())
}

/// Decode a base64 payload back into text.
///
/// The contents API wraps encoded payloads at 60 columns, so ASCII
/// whitespace is stripped before decoding. Invalid input is an error,
/// never silently corrupted output.
pub fn decode(encoded: &str) -> Result<String, CodecError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = general_purpose::STANDARD.decode(compact.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_ascii() {
        let text = "fn main() { println!(\"hello\"); }\n";
        assert_eq!(decode(&encode(text)).expect("decode"), text);
    }

    #[test]
    fn round_trip_non_ascii() {
        let text = "naïve café — über 日本語 🚀";
        assert_eq!(decode(&encode(text)).expect("decode"), text);
    }

    #[test]
    fn round_trip_empty() {
        assert_eq!(decode(&encode("")).expect("decode"), "");
    }

    #[test]
    fn encode_is_deterministic_and_ascii() {
        let text = "some file content\nwith lines\n";
        let first = encode(text);
        let second = encode(text);
        assert_eq!(first, second);
        assert!(first.is_ascii());
    }

    #[test]
    fn decode_accepts_column_wrapped_payloads() {
        // The contents API returns base64 with embedded newlines.
        let wrapped = "aGVsbG8g\nd29ybGQ=\n";
        assert_eq!(decode(wrapped).expect("decode"), "hello world");
    }

    #[test]
    fn decode_rejects_non_alphabet_input() {
        let err = decode("this is not base64!!").expect_err("must fail");
        assert!(matches!(err, CodecError::InvalidBase64(_)));
    }

    #[test]
    fn decode_rejects_non_utf8_payloads() {
        use base64::{engine::general_purpose, Engine as _};
        let encoded = general_purpose::STANDARD.encode([0xff, 0xfe, 0xfd]);
        let err = decode(&encoded).expect_err("must fail");
        assert!(matches!(err, CodecError::InvalidUtf8(_)));
    }
}
