//! # Request Signatures
//!
//! Versioned digest signatures over a [`ParameterSet`]'s canonical string.
//!
//! | Wire value | Algorithm | Digest |
//! |------------|-----------|--------|
//! | `"2"` | MD5 | 128-bit |
//! | `"3"` | SHA-256 | 256-bit (default) |
//!
//! The signature is `digest(canonical_string)` where the canonical string
//! already ends with the shared secret; there is no HMAC construction.

use crate::params::ParameterSet;
use md5::Md5;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Signature algorithm selector, carried on the wire as `sign_version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureVersion {
    /// Legacy MD5 signatures
    V2,
    /// SHA-256 signatures
    V3,
}

impl SignatureVersion {
    /// Version used when a pingback or widget does not name one
    pub const DEFAULT: SignatureVersion = SignatureVersion::V3;

    /// Wire value (`"2"` or `"3"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureVersion::V2 => "2",
            SignatureVersion::V3 => "3",
        }
    }

    /// Resolve a wire value.
    ///
    /// Only `"3"` selects SHA-256. Every other value, recognized or not,
    /// selects the legacy MD5 algorithm, matching the gateway's own fallback.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "3" => SignatureVersion::V3,
            _ => SignatureVersion::V2,
        }
    }

    /// Digest size in bits
    pub fn digest_bits(&self) -> usize {
        match self {
            SignatureVersion::V2 => 128,
            SignatureVersion::V3 => 256,
        }
    }
}

impl Default for SignatureVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for SignatureVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a claimed legacy (v2) signature is compared against the digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestEncoding {
    /// Lowercase hexadecimal
    #[default]
    Hex,
    /// The claimed value's bytes are the raw digest bytes
    Raw,
}

/// Computes and verifies parameter signatures.
///
/// Outbound signatures are always lowercase hex. Inbound verification of
/// v3 signatures is always hex; v2 follows `legacy_encoding`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureEngine {
    legacy_encoding: DigestEncoding,
}

impl SignatureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the encoding used to compare claimed v2 signatures
    pub fn with_legacy_encoding(mut self, encoding: DigestEncoding) -> Self {
        self.legacy_encoding = encoding;
        self
    }

    pub fn legacy_encoding(&self) -> DigestEncoding {
        self.legacy_encoding
    }

    /// Raw digest of the canonical string
    pub fn digest(
        &self,
        params: &ParameterSet,
        excluded_key: Option<&str>,
        secret: &str,
        version: SignatureVersion,
    ) -> Vec<u8> {
        let base = params.canonical_string(excluded_key, secret);
        match version {
            SignatureVersion::V2 => Md5::digest(base.as_bytes()).to_vec(),
            SignatureVersion::V3 => Sha256::digest(base.as_bytes()).to_vec(),
        }
    }

    /// Compute a lowercase hex signature
    pub fn compute(
        &self,
        params: &ParameterSet,
        excluded_key: Option<&str>,
        secret: &str,
        version: SignatureVersion,
    ) -> String {
        hex::encode(self.digest(params, excluded_key, secret, version))
    }

    /// Recompute the signature and compare it to `claimed`.
    ///
    /// The comparison is exact (case-sensitive for hex) and runs in
    /// constant time over equal-length inputs.
    pub fn verify(
        &self,
        params: &ParameterSet,
        excluded_key: Option<&str>,
        claimed: &str,
        secret: &str,
        version: SignatureVersion,
    ) -> bool {
        self.verify_bytes(params, excluded_key, claimed.as_bytes(), secret, version)
    }

    /// Like [`verify`](Self::verify), for a claimed value that is not text.
    ///
    /// A raw legacy digest is arbitrary bytes, so it has to be compared
    /// as the percent-decoded octets the gateway sent.
    pub fn verify_bytes(
        &self,
        params: &ParameterSet,
        excluded_key: Option<&str>,
        claimed: &[u8],
        secret: &str,
        version: SignatureVersion,
    ) -> bool {
        let digest = self.digest(params, excluded_key, secret, version);
        let encoding = match version {
            SignatureVersion::V3 => DigestEncoding::Hex,
            SignatureVersion::V2 => self.legacy_encoding,
        };

        match encoding {
            DigestEncoding::Hex => hex::encode(digest).as_bytes().ct_eq(claimed).into(),
            DigestEncoding::Raw => digest.as_slice().ct_eq(claimed).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParameterSet {
        ParameterSet::new()
            .with("uid", "1")
            .with("type", "0")
            .with("ref", "r1")
            .with("currency", "10")
            .with("sign_version", "3")
    }

    #[test]
    fn test_version_wire_values() {
        assert_eq!(SignatureVersion::from_wire("3"), SignatureVersion::V3);
        assert_eq!(SignatureVersion::from_wire("2"), SignatureVersion::V2);
        assert_eq!(SignatureVersion::default().as_str(), "3");
        assert_eq!(SignatureVersion::V2.digest_bits(), 128);
    }

    #[test]
    fn test_unknown_version_falls_back_to_md5() {
        assert_eq!(SignatureVersion::from_wire("1"), SignatureVersion::V2);
        assert_eq!(SignatureVersion::from_wire("4"), SignatureVersion::V2);
        assert_eq!(SignatureVersion::from_wire(""), SignatureVersion::V2);
    }

    #[test]
    fn test_sha256_matches_known_vector() {
        let engine = SignatureEngine::new();
        let expected = hex::encode(Sha256::digest(
            b"currency=10ref=r1sign_version=3type=0uid=1abc",
        ));

        assert_eq!(
            engine.compute(&sample(), Some("sig"), "abc", SignatureVersion::V3),
            expected
        );
    }

    #[test]
    fn test_md5_empty_input() {
        // md5("") with an empty parameter set and empty secret
        let engine = SignatureEngine::new();
        assert_eq!(
            engine.compute(&ParameterSet::new(), None, "", SignatureVersion::V2),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_round_trip_each_version() {
        let engine = SignatureEngine::new();
        for version in [SignatureVersion::V2, SignatureVersion::V3] {
            let sig = engine.compute(&sample(), Some("sig"), "secret", version);
            assert_eq!(sig.len(), version.digest_bits() / 4);
            assert!(engine.verify(&sample(), Some("sig"), &sig, "secret", version));
        }
    }

    #[test]
    fn test_tampered_value_fails() {
        let engine = SignatureEngine::new();
        let sig = engine.compute(&sample(), Some("sig"), "secret", SignatureVersion::V3);

        let tampered = sample().with("currency", "1000");
        assert!(!engine.verify(&tampered, Some("sig"), &sig, "secret", SignatureVersion::V3));
        assert!(!engine.verify(&sample(), Some("sig"), &sig, "other", SignatureVersion::V3));
    }

    #[test]
    fn test_signature_field_excluded_from_digest() {
        let engine = SignatureEngine::new();
        let sig = engine.compute(&sample(), Some("sig"), "secret", SignatureVersion::V3);

        let with_sig = sample().with("sig", sig.clone());
        assert!(engine.verify(&with_sig, Some("sig"), &sig, "secret", SignatureVersion::V3));
    }

    #[test]
    fn test_hex_comparison_is_case_sensitive() {
        let engine = SignatureEngine::new();
        let sig = engine.compute(&sample(), None, "secret", SignatureVersion::V3);
        assert!(!engine.verify(&sample(), None, &sig.to_uppercase(), "secret", SignatureVersion::V3));
    }

    #[test]
    fn test_raw_legacy_encoding() {
        let engine = SignatureEngine::new().with_legacy_encoding(DigestEncoding::Raw);
        let hex_sig = engine.compute(&sample(), None, "secret", SignatureVersion::V2);
        let raw = engine.digest(&sample(), None, "secret", SignatureVersion::V2);

        assert_eq!(raw.len(), 16);
        assert!(engine.verify_bytes(&sample(), None, &raw, "secret", SignatureVersion::V2));
        // Hex is not accepted for v2 once raw comparison is configured
        assert!(!engine.verify(&sample(), None, &hex_sig, "secret", SignatureVersion::V2));

        let mut flipped = raw.clone();
        flipped[0] ^= 0x01;
        assert!(!engine.verify_bytes(&sample(), None, &flipped, "secret", SignatureVersion::V2));
    }

    #[test]
    fn test_raw_setting_leaves_v3_hex() {
        let engine = SignatureEngine::new().with_legacy_encoding(DigestEncoding::Raw);
        let v3 = engine.compute(&sample(), None, "secret", SignatureVersion::V3);
        let raw_v3 = engine.digest(&sample(), None, "secret", SignatureVersion::V3);

        assert!(engine.verify(&sample(), None, &v3, "secret", SignatureVersion::V3));
        assert!(!engine.verify_bytes(&sample(), None, &raw_v3, "secret", SignatureVersion::V3));
    }

    #[test]
    fn test_hex_engine_rejects_raw_bytes() {
        let engine = SignatureEngine::new();
        let raw = engine.digest(&sample(), None, "secret", SignatureVersion::V2);
        assert!(!engine.verify_bytes(&sample(), None, &raw, "secret", SignatureVersion::V2));
    }
}
