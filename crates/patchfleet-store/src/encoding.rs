//! Content transport encoding.
//!
//! File bodies cross the wire as standard base64. Hosts are free to wrap the
//! encoded payload at a fixed column width (GitHub uses 60), so [`decode`]
//! strips every ASCII whitespace byte before decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::StoreError;
use crate::storage_traits::StoreResult;

/// Column width hosts commonly wrap encoded content at.
pub const WRAP_WIDTH: usize = 60;

/// Encode raw bytes for transmission.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a (possibly line-wrapped) payload back into raw bytes.
pub fn decode(encoded: &str) -> StoreResult<Vec<u8>> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| StoreError::Decode(format!("invalid base64 content: {e}")))
}

/// Wrap an encoded payload at `width` columns, newline-terminating each line.
pub fn wrap(encoded: &str, width: usize) -> String {
    if width == 0 || encoded.is_empty() {
        return encoded.to_string();
    }
    let mut out = String::with_capacity(encoded.len() + encoded.len() / width + 1);
    for chunk in encoded.as_bytes().chunks(width) {
        // base64 output is ASCII, so byte chunks are valid UTF-8.
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_inverts_encode() {
        for sample in [&b""[..], b"a", b"a\nb", b"x\ny\nz\n", "h\u{e9}llo".as_bytes()] {
            assert_eq!(decode(&encode(sample)).unwrap(), sample);
        }
    }

    #[test]
    fn encode_inverts_decode_for_canonical_input() {
        let canonical = "eAp5Cno=";
        assert_eq!(encode(&decode(canonical).unwrap()), canonical);
    }

    #[test]
    fn decode_tolerates_line_wrapping() {
        let body = "line one\nline two\nline three\n".repeat(8);
        let wrapped = wrap(&encode(body.as_bytes()), WRAP_WIDTH);
        assert!(wrapped.contains('\n'));
        assert_eq!(decode(&wrapped).unwrap(), body.as_bytes());
        assert_eq!(encode(&decode(&wrapped).unwrap()), encode(body.as_bytes()));
    }

    #[test]
    fn decode_tolerates_crlf_and_spaces() {
        let encoded = encode(b"patched content");
        let (head, tail) = encoded.split_at(6);
        let messy = format!(" {head}\r\n\t{tail} \n");
        assert_eq!(decode(&messy).unwrap(), b"patched content");
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode("not*base64!").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn wrap_splits_at_width() {
        let wrapped = wrap("abcdefgh", 3);
        assert_eq!(wrapped, "abc\ndef\ngh\n");
        assert_eq!(wrap("", 3), "");
    }
}
