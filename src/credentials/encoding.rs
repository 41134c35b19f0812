use base64ct::{Base64UrlUnpadded, Encoding};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn b64e(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

/// Decode unpadded base64url, returning `None` on any invalid input.
pub(crate) fn b64d(segment: &str) -> Option<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(segment).ok()
}

/// Byte comparison whose running time depends only on the lengths.
///
/// A length mismatch returns early; equal-length inputs are always fully scanned.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn b64_uses_url_safe_alphabet_without_padding() {
        let encoded = b64e(&[0xfb, 0xff, 0xfe]);
        assert_eq!(encoded, "-__-");
        assert_eq!(b64e(b"a"), "YQ");
        assert_eq!(b64d("YQ").as_deref(), Some(b"a".as_slice()));
    }

    #[test]
    fn b64d_rejects_padding_and_standard_alphabet() {
        assert!(b64d("YQ==").is_none());
        assert!(b64d("+/+/").is_none());
        assert!(b64d("not base64!").is_none());
    }

    #[test]
    fn unix_now_is_after_2023() {
        assert!(unix_now() > 1_700_000_000);
    }
}
