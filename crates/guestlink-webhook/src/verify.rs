// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signature and freshness verification for inbound events.
//!
//! The provider signs `"{timestamp}.{body}"` with ECDSA P-256/SHA-256. The
//! replay window is checked before any cryptography so stale requests fail
//! cheap. All failures collapse to [`GuestlinkError::Unauthorized`]; logs
//! carry request metadata, never key material.

use chrono::{DateTime, Utc};
use guestlink_core::GuestlinkError;
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};
use tracing::warn;

/// Maximum accepted clock skew between the timestamp header and now.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Verify an inbound event's timestamp freshness and signature.
///
/// `timestamp` is the raw header value, unix seconds as decimal text.
/// `signature_hex` is the hex-encoded ASN.1 DER signature. `public_key_der`
/// is the provider's DER-encoded P-256 public key.
pub fn verify(
    raw_body: &[u8],
    signature_hex: &str,
    timestamp: &str,
    public_key_der: &[u8],
    now: DateTime<Utc>,
) -> Result<(), GuestlinkError> {
    let Ok(ts) = timestamp.trim().parse::<i64>() else {
        warn!(body_len = raw_body.len(), "inbound event rejected: unparseable timestamp");
        return Err(GuestlinkError::Unauthorized);
    };

    // Freshness first: no crypto spent on replayed or far-future requests.
    let skew = (now.timestamp() - ts).abs();
    if skew > REPLAY_WINDOW_SECS {
        warn!(
            body_len = raw_body.len(),
            skew_secs = skew,
            "inbound event rejected: outside replay window"
        );
        return Err(GuestlinkError::Unauthorized);
    }

    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        warn!(body_len = raw_body.len(), "inbound event rejected: signature is not hex");
        return Err(GuestlinkError::Unauthorized);
    };

    // Signed payload is "{timestamp}.{body}".
    let mut payload = Vec::with_capacity(timestamp.len() + 1 + raw_body.len());
    payload.extend_from_slice(timestamp.trim().as_bytes());
    payload.push(b'.');
    payload.extend_from_slice(raw_body);

    let public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, public_key_der);
    if public_key.verify(&payload, &signature).is_err() {
        warn!(
            body_len = raw_body.len(),
            skew_secs = skew,
            "inbound event rejected: signature verification failed"
        );
        return Err(GuestlinkError::Unauthorized);
    }
    Ok(())
}
