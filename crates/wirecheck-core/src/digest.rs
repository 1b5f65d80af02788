//! # Report Digests
//!
//! A [`ReportDigest`] is the SHA-256 of a rendered report. Two runs over
//! unchanged inputs must produce byte-identical output, so equal digests are
//! the cheapest way to assert (and log) that property.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 digest of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportDigest {
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ReportDigest {
    /// Digest the given bytes.
    pub fn of(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self { bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ReportDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// SHA-256 hex string of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    ReportDigest::of(data).to_hex()
}
