//! Webhook signature check — `X-Hub-Signature-256: sha256=<hex hmac>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const PREFIX: &str = "sha256=";

/// Verify the HMAC-SHA256 of `body` under the app secret.
///
/// The comparison is constant-time.
pub fn verify_signature(app_secret: &[u8], header: Option<&str>, body: &[u8]) -> bool {
    let Some(provided) = header.and_then(|h| h.trim().strip_prefix(PREFIX)) else {
        return false;
    };
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

/// Header value the provider would send for `body`.
pub fn sign(app_secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret).expect("HMAC takes any key length");
    mac.update(body);
    format!("{PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"app-secret";
    const BODY: &[u8] = br#"{"object":"whatsapp_business_account","entry":[]}"#;

    #[test]
    fn accepts_matching_signature() {
        let header = sign(SECRET, BODY);
        assert!(header.starts_with("sha256="));
        assert!(verify_signature(SECRET, Some(&header), BODY));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign(SECRET, BODY);
        assert!(!verify_signature(SECRET, Some(&header), b"{}"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = sign(b"other", BODY);
        assert!(!verify_signature(SECRET, Some(&header), BODY));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(!verify_signature(SECRET, None, BODY));
        assert!(!verify_signature(SECRET, Some("md5=abcd"), BODY));
        assert!(!verify_signature(SECRET, Some("sha256=not-hex"), BODY));
        assert!(!verify_signature(SECRET, Some("sha256="), BODY));
    }
}
