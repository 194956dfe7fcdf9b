//! Provider signature schemes for inbound webhooks.
//!
//! Every scheme hashes the exact bytes received on the wire. The body must
//! never be parsed and re-serialized before it reaches [`verify`].

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::WebhookSecret;
use crate::error::{WebhookError, WebhookResult};
use crate::provider::Provider;

type HmacSha256 = Hmac<Sha256>;

pub const CASHFREE_SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const CASHFREE_TIMESTAMP_HEADER: &str = "x-webhook-timestamp";
pub const RAZORPAY_SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Signature material a provider attached to a delivery.
#[derive(Clone)]
pub struct SignatureProof {
    pub provider: Provider,
    pub signature: String,
    pub timestamp: Option<String>,
}

impl std::fmt::Debug for SignatureProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureProof")
            .field("provider", &self.provider)
            .field("signature", &"***redacted***")
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// A raw body whose signature has been checked. Only [`verify`] can build one.
#[derive(Debug, Clone, Copy)]
pub struct VerifiedBody<'a> {
    provider: Provider,
    body: &'a [u8],
}

impl<'a> VerifiedBody<'a> {
    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.body
    }
}

pub trait SignatureScheme: Send + Sync {
    fn provider(&self) -> Provider;

    /// Pulls the signature (and timestamp, where the scheme uses one) out of the headers.
    fn extract_proof(&self, headers: &HeaderMap) -> WebhookResult<SignatureProof>;

    /// The signature the provider would have sent for `body`, in its wire encoding.
    fn expected_signature(
        &self,
        proof: &SignatureProof,
        body: &[u8],
        secret: &WebhookSecret,
    ) -> WebhookResult<String>;
}

/// Cashfree: base64(HMAC-SHA256(timestamp + "." + body)).
#[derive(Debug, Clone, Copy, Default)]
pub struct CashfreeScheme;

impl SignatureScheme for CashfreeScheme {
    fn provider(&self) -> Provider {
        Provider::Cashfree
    }

    fn extract_proof(&self, headers: &HeaderMap) -> WebhookResult<SignatureProof> {
        let signature = header_value(headers, CASHFREE_SIGNATURE_HEADER);
        let timestamp = header_value(headers, CASHFREE_TIMESTAMP_HEADER);
        match (signature, timestamp) {
            (Some(signature), Some(timestamp)) => Ok(SignatureProof {
                provider: Provider::Cashfree,
                signature,
                timestamp: Some(timestamp),
            }),
            _ => Err(WebhookError::MissingCredentials(Provider::Cashfree)),
        }
    }

    fn expected_signature(
        &self,
        proof: &SignatureProof,
        body: &[u8],
        secret: &WebhookSecret,
    ) -> WebhookResult<String> {
        let timestamp = proof
            .timestamp
            .as_deref()
            .ok_or(WebhookError::MissingCredentials(Provider::Cashfree))?;
        let mut mac = new_mac(secret)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// Razorpay: lowercase hex(HMAC-SHA256(body)).
#[derive(Debug, Clone, Copy, Default)]
pub struct RazorpayScheme;

impl SignatureScheme for RazorpayScheme {
    fn provider(&self) -> Provider {
        Provider::Razorpay
    }

    fn extract_proof(&self, headers: &HeaderMap) -> WebhookResult<SignatureProof> {
        let signature = header_value(headers, RAZORPAY_SIGNATURE_HEADER)
            .ok_or(WebhookError::MissingCredentials(Provider::Razorpay))?;
        Ok(SignatureProof {
            provider: Provider::Razorpay,
            signature,
            timestamp: None,
        })
    }

    fn expected_signature(
        &self,
        _proof: &SignatureProof,
        body: &[u8],
        secret: &WebhookSecret,
    ) -> WebhookResult<String> {
        let mut mac = new_mac(secret)?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

static CASHFREE: CashfreeScheme = CashfreeScheme;
static RAZORPAY: RazorpayScheme = RazorpayScheme;

pub fn scheme_for(provider: Provider) -> &'static dyn SignatureScheme {
    match provider {
        Provider::Cashfree => &CASHFREE,
        Provider::Razorpay => &RAZORPAY,
    }
}

/// Checks the delivery's signature against `secret`.
pub fn verify<'a>(
    scheme: &dyn SignatureScheme,
    headers: &HeaderMap,
    body: &'a [u8],
    secret: &WebhookSecret,
) -> WebhookResult<VerifiedBody<'a>> {
    let provider = scheme.provider();
    let proof = scheme.extract_proof(headers)?;
    let expected = scheme.expected_signature(&proof, body, secret)?;
    let verified = constant_time_eq(expected.as_bytes(), proof.signature.as_bytes());
    debug!(provider = %provider, verified, "Webhook signature checked");
    if !verified {
        return Err(WebhookError::InvalidSignature);
    }
    Ok(VerifiedBody { provider, body })
}

/// Computes the signature `provider` would send for `body`.
pub fn sign(
    provider: Provider,
    secret: &WebhookSecret,
    body: &[u8],
    timestamp: Option<&str>,
) -> WebhookResult<String> {
    let proof = SignatureProof {
        provider,
        signature: String::new(),
        timestamp: timestamp.map(str::to_string),
    };
    scheme_for(provider).expected_signature(&proof, body, secret)
}

fn new_mac(secret: &WebhookSecret) -> WebhookResult<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::Internal("invalid HMAC key length".into()))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn secret() -> WebhookSecret {
        WebhookSecret::new("s3cr3t")
    }

    fn razorpay_headers(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RAZORPAY_SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers
    }

    fn cashfree_headers(signature: &str, timestamp: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CASHFREE_SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers.insert(CASHFREE_TIMESTAMP_HEADER, HeaderValue::from_str(timestamp).unwrap());
        headers
    }

    #[test]
    fn razorpay_signature_matches_reference_hmac() {
        let body = br#"{"event":"payment.success"}"#;
        let mut mac = HmacSha256::new_from_slice(b"s3cr3t").unwrap();
        mac.update(body);
        let reference = hex::encode(mac.finalize().into_bytes());

        let computed = sign(Provider::Razorpay, &secret(), body, None).unwrap();
        assert_eq!(computed, reference);
        assert_eq!(computed, sign(Provider::Razorpay, &secret(), body, None).unwrap());
        assert_eq!(computed.len(), 64);
        assert!(computed.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn razorpay_accepts_valid_signature() {
        let body = br#"{"event":"payment.captured","amount":5000}"#;
        let sig = sign(Provider::Razorpay, &secret(), body, None).unwrap();
        let verified = verify(&RazorpayScheme, &razorpay_headers(&sig), body, &secret()).unwrap();
        assert_eq!(verified.provider(), Provider::Razorpay);
        assert_eq!(verified.bytes(), body);
    }

    #[test]
    fn razorpay_rejects_any_single_byte_flip() {
        let body = br#"{"event":"payment.success"}"#.to_vec();
        let sig = sign(Provider::Razorpay, &secret(), &body, None).unwrap();
        let headers = razorpay_headers(&sig);
        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            let err = verify(&RazorpayScheme, &headers, &tampered, &secret()).unwrap_err();
            assert!(matches!(err, WebhookError::InvalidSignature), "byte {i} flip accepted");
        }
    }

    #[test]
    fn razorpay_comparison_is_case_sensitive() {
        let body = b"{}";
        let sig = sign(Provider::Razorpay, &secret(), body, None).unwrap().to_uppercase();
        let err = verify(&RazorpayScheme, &razorpay_headers(&sig), body, &secret()).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn razorpay_rejects_wrong_secret() {
        let body = b"{}";
        let sig = sign(Provider::Razorpay, &WebhookSecret::new("other"), body, None).unwrap();
        let err = verify(&RazorpayScheme, &razorpay_headers(&sig), body, &secret()).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn razorpay_missing_header_is_missing_credentials() {
        for body in [&b""[..], &b"{}"[..], &b"not json at all"[..]] {
            let err = verify(&RazorpayScheme, &HeaderMap::new(), body, &secret()).unwrap_err();
            assert!(matches!(err, WebhookError::MissingCredentials(Provider::Razorpay)));
        }
        let err = verify(&RazorpayScheme, &razorpay_headers(""), b"{}", &secret()).unwrap_err();
        assert!(matches!(err, WebhookError::MissingCredentials(Provider::Razorpay)));
    }

    #[test]
    fn cashfree_signature_matches_documented_construction() {
        let body = br#"{"orderId":"o1"}"#;
        let mut mac = HmacSha256::new_from_slice(b"s3cr3t").unwrap();
        mac.update(b"1700000000.");
        mac.update(body);
        let reference = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        let computed = sign(Provider::Cashfree, &secret(), body, Some("1700000000")).unwrap();
        assert_eq!(computed, reference);

        let headers = cashfree_headers(&computed, "1700000000");
        let verified = verify(&CashfreeScheme, &headers, body, &secret()).unwrap();
        assert_eq!(verified.provider(), Provider::Cashfree);
    }

    #[test]
    fn cashfree_rejects_timestamp_mutation() {
        let body = br#"{"orderId":"o1"}"#;
        let sig = sign(Provider::Cashfree, &secret(), body, Some("1700000000")).unwrap();
        for ts in ["1700000001", "170000000", "17000000000", "2700000000"] {
            let err = verify(&CashfreeScheme, &cashfree_headers(&sig, ts), body, &secret()).unwrap_err();
            assert!(matches!(err, WebhookError::InvalidSignature), "timestamp {ts} accepted");
        }
    }

    #[test]
    fn cashfree_rejects_body_mutation() {
        let body = br#"{"orderId":"o1","amount":100}"#.to_vec();
        let sig = sign(Provider::Cashfree, &secret(), &body, Some("1700000000")).unwrap();
        let headers = cashfree_headers(&sig, "1700000000");
        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] = tampered[i].wrapping_add(1);
            let err = verify(&CashfreeScheme, &headers, &tampered, &secret()).unwrap_err();
            assert!(matches!(err, WebhookError::InvalidSignature), "byte {i} mutation accepted");
        }
    }

    #[test]
    fn cashfree_reserialized_body_is_rejected() {
        let body = br#"{ "orderId" : "o1" }"#;
        let sig = sign(Provider::Cashfree, &secret(), body, Some("1700000000")).unwrap();
        let reparsed: serde_json::Value = serde_json::from_slice(body).unwrap();
        let reserialized = serde_json::to_vec(&reparsed).unwrap();
        let err = verify(&CashfreeScheme, &cashfree_headers(&sig, "1700000000"), &reserialized, &secret())
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn cashfree_missing_either_header_is_missing_credentials() {
        let body = br#"{"orderId":"o1"}"#;
        let sig = sign(Provider::Cashfree, &secret(), body, Some("1700000000")).unwrap();

        let mut only_sig = HeaderMap::new();
        only_sig.insert(CASHFREE_SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());
        let mut only_ts = HeaderMap::new();
        only_ts.insert(CASHFREE_TIMESTAMP_HEADER, HeaderValue::from_static("1700000000"));

        for headers in [only_sig, only_ts, HeaderMap::new()] {
            let err = verify(&CashfreeScheme, &headers, body, &secret()).unwrap_err();
            assert!(matches!(err, WebhookError::MissingCredentials(Provider::Cashfree)));
        }
    }

    #[test]
    fn proof_debug_redacts_signature() {
        let proof = CashfreeScheme
            .extract_proof(&cashfree_headers("c2lnbmF0dXJl", "1700000000"))
            .unwrap();
        let rendered = format!("{proof:?}");
        assert!(!rendered.contains("c2lnbmF0dXJl"));
        assert!(rendered.contains("1700000000"));
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn scheme_table_covers_every_provider() {
        for provider in Provider::ALL {
            assert_eq!(scheme_for(provider).provider(), provider);
        }
    }
}
