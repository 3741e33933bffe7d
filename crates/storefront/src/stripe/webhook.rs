//! Stripe webhook signature verification.
//!
//! Implements Stripe's signing scheme:
//! <https://docs.stripe.com/webhooks#verify-manually>
//!
//! The `Stripe-Signature` header has the form `t=<unix>,v1=<hex>[,v1=<hex>]`.
//! Each `v1` value is an HMAC-SHA256 of `"{t}.{raw body}"` keyed with the
//! endpoint's signing secret. Verification must run over the exact bytes
//! received; re-serialized JSON will not match.

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, instrument};

use super::StripeError;
use super::types::Event;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default tolerance between the signed timestamp and now.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Parsed `Stripe-Signature` header.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>, StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    StripeError::InvalidSignature("Invalid timestamp".to_string())
                })?);
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeError::InvalidSignature("Missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature(
            "No v1 signatures found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn signed_mac(payload: &[u8], secret: &SecretString, timestamp: i64) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.expose_secret().as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Verify a signature header against the raw payload.
///
/// # Errors
///
/// Returns [`StripeError::InvalidSignature`] if the header is malformed, no
/// `v1` signature matches, or the timestamp is outside `tolerance`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    tolerance: Duration,
) -> Result<(), StripeError> {
    verify_signature_at(
        payload,
        header,
        secret,
        tolerance,
        chrono::Utc::now().timestamp(),
    )
}

fn verify_signature_at(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    tolerance: Duration,
    now: i64,
) -> Result<(), StripeError> {
    let parsed = parse_header(header)?;
    let mac = signed_mac(payload, secret, parsed.timestamp);

    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if !matched {
        return Err(StripeError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    let tolerance = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if now.saturating_sub(parsed.timestamp).abs() > tolerance {
        return Err(StripeError::InvalidSignature(
            "Timestamp outside the tolerance zone".to_string(),
        ));
    }

    Ok(())
}

/// Verify the signature and decode the event.
///
/// # Errors
///
/// Returns [`StripeError::InvalidSignature`] if verification fails and
/// [`StripeError::Parse`] if the verified payload is not an event.
#[instrument(skip_all)]
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    tolerance: Duration,
) -> Result<Event, StripeError> {
    verify_signature(payload, header, secret, tolerance)?;
    debug!("Stripe signature verified");

    serde_json::from_slice(payload).map_err(|e| StripeError::Parse(e.to_string()))
}

/// Build a `Stripe-Signature` header for a payload.
///
/// Used to sign fixtures when exercising the webhook endpoint.
#[must_use]
pub fn signature_header(payload: &[u8], secret: &SecretString, timestamp: i64) -> String {
    let signature = hex::encode(signed_mac(payload, secret, timestamp).finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn secret() -> SecretString {
        SecretString::from("whsec_test_9f8e7d6c5b4a")
    }

    #[test]
    fn test_parse_header() {
        let parsed = parse_header("t=12,v1=abc,v0=old,v1=def").unwrap();
        assert_eq!(parsed.timestamp, 12);
        assert_eq!(parsed.signatures, vec!["abc", "def"]);
    }

    #[test]
    fn test_parse_header_errors() {
        assert!(matches!(
            parse_header("v1=abc"),
            Err(StripeError::InvalidSignature(_))
        ));
        assert!(matches!(
            parse_header("t=12"),
            Err(StripeError::InvalidSignature(_))
        ));
        assert!(matches!(
            parse_header("t=soon,v1=abc"),
            Err(StripeError::InvalidSignature(_))
        ));
        assert!(parse_header("").is_err());
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"ping"}"#;
        let header = signature_header(payload, &secret(), NOW);
        assert!(verify_signature_at(payload, &header, &secret(), DEFAULT_TOLERANCE, NOW).is_ok());
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let payload = b"{}";
        let good = signature_header(payload, &secret(), NOW);
        let good_sig = good.split_once("v1=").unwrap().1;
        let header = format!("t={NOW},v1=deadbeef,v1={good_sig}");
        assert!(verify_signature_at(payload, &header, &secret(), DEFAULT_TOLERANCE, NOW).is_ok());
    }

    #[test]
    fn test_tampered_body_fails() {
        let header = signature_header(br#"{"amount":100}"#, &secret(), NOW);
        let result = verify_signature_at(
            br#"{"amount":1000}"#,
            &header,
            &secret(),
            DEFAULT_TOLERANCE,
            NOW,
        );
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_reserialized_body_fails() {
        // Same JSON value, different bytes
        let raw = br#"{"id": "evt_1", "type": "ping"}"#;
        let header = signature_header(raw, &secret(), NOW);
        let reserialized =
            serde_json::to_vec(&serde_json::from_slice::<serde_json::Value>(raw).unwrap())
                .unwrap();
        assert!(
            verify_signature_at(&reserialized, &header, &secret(), DEFAULT_TOLERANCE, NOW)
                .is_err()
        );
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = b"{}";
        let header = signature_header(payload, &SecretString::from("whsec_other"), NOW);
        assert!(verify_signature_at(payload, &header, &secret(), DEFAULT_TOLERANCE, NOW).is_err());
    }

    #[test]
    fn test_old_timestamp_fails() {
        let payload = b"{}";
        let header = signature_header(payload, &secret(), NOW - 600);
        let result = verify_signature_at(payload, &header, &secret(), DEFAULT_TOLERANCE, NOW);
        match result {
            Err(StripeError::InvalidSignature(reason)) => {
                assert!(reason.contains("tolerance"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_construct_event() {
        let payload = br#"{"id":"evt_1","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
        let header = signature_header(payload, &secret(), chrono::Utc::now().timestamp());
        let event = construct_event(payload, &header, &secret(), DEFAULT_TOLERANCE).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, "customer.created");
    }

    #[test]
    fn test_construct_event_rejects_non_event_payload() {
        let payload = b"not json";
        let header = signature_header(payload, &secret(), chrono::Utc::now().timestamp());
        assert!(matches!(
            construct_event(payload, &header, &secret(), DEFAULT_TOLERANCE),
            Err(StripeError::Parse(_))
        ));
    }
}
