//! Webhook signature verification using HMAC-SHA256.
//!
//! The provider signs each delivery over the exact raw body and sends the
//! signature in a header of comma-separated `key=value` pairs, e.g.
//! `t=1707232132,v1=<hex-hmac>`. Verification is the first step in webhook
//! processing; invalid signatures are rejected before parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Extracts the hex signature from a signature header.
///
/// Accepts the structured form (`t=...,v1=<hex>`, any pair order) and falls
/// back to treating the entire header value as the signature when it has no
/// such structure. Returns `None` for headers whose signature part is not
/// valid hex. Never panics.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == "v1")
        .map_or_else(|| header.trim(), |(_, value)| value.trim());

    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload using the given key.
///
/// Also used by tests to generate expected signatures.
pub fn compute_signature(payload: &[u8], key: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a provider-style header value.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!("t={},v1={}", timestamp, hex::encode(signature))
}

/// Verifies a webhook signature against the raw payload and key.
///
/// Returns `true` if the signature is valid, `false` otherwise. Lengths are
/// compared first and a mismatch rejects without comparing content; the
/// content comparison itself is constant-time.
pub fn verify_signature(payload: &[u8], signature_header: &str, key: &[u8]) -> bool {
    let received = match parse_signature_header(signature_header) {
        Some(sig) => sig,
        None => return false,
    };

    // HMAC-SHA256 output is 32 bytes; anything else cannot match and is
    // rejected before the comparison to avoid leaking length via timing.
    if received.len() != 32 {
        return false;
    }

    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&received).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"wh-signing-key";
    const BODY: &[u8] = br#"{"event":"invitee.created","payload":{"uri":"inv-1"}}"#;

    fn valid_header() -> String {
        format_signature_header(1707232132, &compute_signature(BODY, KEY))
    }

    #[test]
    fn correctly_computed_signature_passes() {
        assert!(verify_signature(BODY, &valid_header(), KEY));
    }

    #[test]
    fn bare_hex_header_is_accepted_as_signature() {
        let header = hex::encode(compute_signature(BODY, KEY));
        assert!(verify_signature(BODY, &header, KEY));
    }

    #[test]
    fn pair_order_does_not_matter() {
        let header =
            format!("v1={},t=1707232132", hex::encode(compute_signature(BODY, KEY)));
        assert!(verify_signature(BODY, &header, KEY));
    }

    #[test]
    fn flipped_signature_byte_fails() {
        let mut sig = compute_signature(BODY, KEY);
        sig[0] ^= 0x01;
        let header = format_signature_header(1707232132, &sig);
        assert!(!verify_signature(BODY, &header, KEY));
    }

    #[test]
    fn flipped_body_byte_fails() {
        let header = valid_header();
        let mut body = BODY.to_vec();
        body[0] ^= 0x01;
        assert!(!verify_signature(&body, &header, KEY));
    }

    #[test]
    fn wrong_key_fails() {
        assert!(!verify_signature(BODY, &valid_header(), b"other-key"));
    }

    #[test]
    fn wrong_length_signature_fails() {
        // Valid hex but not 32 bytes
        assert!(!verify_signature(BODY, "t=1,v1=abcd", KEY));
        assert!(!verify_signature(BODY, "t=1,v1=", KEY));
    }

    #[test]
    fn malformed_headers_fail_without_panicking() {
        assert!(!verify_signature(BODY, "", KEY));
        assert!(!verify_signature(BODY, "not hex at all", KEY));
        assert!(!verify_signature(BODY, "t=123", KEY));
        assert!(!verify_signature(BODY, "v1=zzzz", KEY));
        assert!(!verify_signature(BODY, ",,,,", KEY));
    }

    #[test]
    fn empty_payload_and_empty_key_still_verify() {
        let sig = compute_signature(b"", b"");
        let header = format_signature_header(0, &sig);
        assert!(verify_signature(b"", &header, b""));
    }

    #[test]
    fn parse_extracts_v1_pair() {
        let parsed = parse_signature_header("t=99,v1=1234abcd").unwrap();
        assert_eq!(parsed, vec![0x12, 0x34, 0xab, 0xcd]);
    }

    #[test]
    fn parse_rejects_bad_hex() {
        assert!(parse_signature_header("t=99,v1=xyz").is_none());
    }
}
