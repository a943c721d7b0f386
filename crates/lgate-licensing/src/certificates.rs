//! ---
//! lgate_section: "01-license-gate"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Signed license envelopes and their verification."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::to_vec;
use std::convert::TryInto;

/// Envelope format version written by [`issue_certificate`].
pub const ENVELOPE_VERSION: u32 = 1;

/// Signed claims carried by a license file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LicensePayload {
    /// Identifier of the issued key.
    pub key_id: String,
    /// Licensee.
    pub owner: String,
    /// Product the license grants.
    pub product: String,
    /// RFC 3339 expiry timestamp.
    pub expires_at: String,
    /// Optional RFC 3339 issuance timestamp.
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl LicensePayload {
    /// Parse `expires_at`.
    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        self.expires_at
            .parse::<DateTime<Utc>>()
            .map_err(|err| anyhow!("invalid expires_at timestamp: {err}"))
    }

    /// Parse `issued_at` when present.
    pub fn issued_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.issued_at
            .as_deref()
            .map(|value| value.parse::<DateTime<Utc>>())
            .transpose()
            .map_err(|err| anyhow!("invalid issued_at timestamp: {err}"))
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct LicenseEnvelope {
    version: u32,
    payload: LicensePayload,
    signature: String,
}

/// In-memory representation of a signed license certificate.
#[derive(Debug, Clone)]
pub struct LicenseCertificate {
    /// Envelope format version.
    pub version: u32,
    /// Signed claims.
    pub payload: LicensePayload,
    pub(crate) signature: String,
}

impl LicenseCertificate {
    /// Decode base64 license material into a certificate without verifying it.
    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = general_purpose::STANDARD
            .decode(raw.trim())
            .with_context(|| "license payload must be base64 encoded")?;
        let envelope: LicenseEnvelope = serde_json::from_slice(&bytes)
            .with_context(|| "license must decode into a JSON envelope")?;
        Ok(Self {
            version: envelope.version,
            payload: envelope.payload,
            signature: envelope.signature,
        })
    }
}

/// Verify a license certificate using the provided public key bytes.
pub fn verify_certificate(certificate: &LicenseCertificate, public_key: &[u8; 32]) -> Result<()> {
    let key = VerifyingKey::from_bytes(public_key)
        .map_err(|err| anyhow!("invalid public key material: {err}"))?;
    let signature_bytes = general_purpose::STANDARD
        .decode(certificate.signature.trim())
        .with_context(|| "license signature must be base64 encoded")?;
    let signature_array: [u8; 64] = signature_bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("invalid license signature length"))?;
    let signature = Signature::from_bytes(&signature_array);
    let payload = to_vec(&certificate.payload)
        .map_err(|err| anyhow!("failed to serialise license payload: {err}"))?;

    key.verify_strict(&payload, &signature)
        .map_err(|err| anyhow!("license signature verification failed: {err}"))?;
    Ok(())
}

/// Sign `payload` and encode it as distributable license material.
pub fn issue_certificate(payload: &LicensePayload, signing_key: &SigningKey) -> Result<String> {
    let message =
        to_vec(payload).map_err(|err| anyhow!("failed to serialise license payload: {err}"))?;
    let signature = signing_key.sign(&message);
    let envelope = LicenseEnvelope {
        version: ENVELOPE_VERSION,
        payload: payload.clone(),
        signature: general_purpose::STANDARD.encode(signature.to_bytes()),
    };
    let bytes = to_vec(&envelope).context("failed to serialise license envelope")?;
    Ok(general_purpose::STANDARD.encode(bytes))
}

/// Decode a base64 Ed25519 public key.
pub fn decode_public_key(encoded: &str) -> Result<[u8; 32]> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .with_context(|| "public key must be base64 encoded")?;
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("public key must be 32 bytes, got {}", bytes.len()))?;
    VerifyingKey::from_bytes(&key).map_err(|err| anyhow!("invalid public key material: {err}"))?;
    Ok(key)
}

/// Decode a base64 Ed25519 secret seed.
pub fn decode_signing_key(encoded: &str) -> Result<SigningKey> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .with_context(|| "signing key must be base64 encoded")?;
    let seed: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("signing key must be 32 bytes, got {}", bytes.len()))?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Base64 encoding of the public half of `signing_key`.
#[must_use]
pub fn encode_public_key(signing_key: &SigningKey) -> String {
    general_purpose::STANDARD.encode(signing_key.verifying_key().to_bytes())
}
