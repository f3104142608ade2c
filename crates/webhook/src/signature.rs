//! `X-Hub-Signature-256` validation: HMAC-SHA256 of the raw body, keyed by
//! a configured secret, constant-time compared.
//!
//! Grounded in the cross-pack precedent for HMAC-keyed webhook validation
//! (`hmac`/`sha2`/`subtle` appear for this exact purpose elsewhere in the
//! broader example pack); not part of the teacher's own dependency set, but
//! the natural crate for this job.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing X-Hub-Signature-256 header")]
    Missing,
    #[error("signature header is not in the sha256=<hex> form")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
}

/// Validates `header_value` against `body` using `secret`.
///
/// An empty secret disables validation entirely (the call always
/// succeeds), matching the configuration contract: `WebhookSecret` empty
/// means signature checking is off.
pub fn verify(secret: &str, header_value: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Ok(());
    }

    let header_value = header_value.ok_or(SignatureError::Missing)?;
    let hex_digest = header_value
        .strip_prefix("sha256=")
        .ok_or(SignatureError::Malformed)?;

    let provided = hex_decode(hex_digest).ok_or(SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    if expected.ct_eq(&provided).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let digest = mac.finalize().into_bytes();
        format!("sha256={}", digest.iter().map(|b| format!("{b:02x}")).collect::<String>())
    }

    #[test]
    fn empty_secret_disables_validation() {
        assert!(verify("", None, b"anything").is_ok());
    }

    #[test]
    fn valid_signature_passes() {
        let body = b"{\"hello\":\"world\"}";
        let header = sign("s3cr3t", body);
        assert!(verify("s3cr3t", Some(&header), body).is_ok());
    }

    #[test]
    fn missing_header_is_rejected_when_secret_configured() {
        assert_eq!(verify("s3cr3t", None, b"body"), Err(SignatureError::Missing));
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert_eq!(
            verify("s3cr3t", Some("not-hex"), b"body"),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let body = b"payload";
        let header = sign("other-secret", body);
        assert_eq!(
            verify("s3cr3t", Some(&header), body),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign("s3cr3t", b"original");
        assert_eq!(
            verify("s3cr3t", Some(&header), b"tampered"),
            Err(SignatureError::Mismatch)
        );
    }
}
