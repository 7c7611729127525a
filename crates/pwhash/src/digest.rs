use base64::{Engine as _, engine::general_purpose::STANDARD};
use core::fmt;
use serde::Serialize;
use sha2::{Digest as _, Sha512};

/// A base64-encoded SHA-512 digest of a password.
///
/// Digests are produced once by a deferred hashing task and never modified
/// afterwards, so the inner string is only exposed by reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Returns the encoded digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the digest, returning the encoded string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// Computes the standard (padded) base64 encoding of the SHA-512 hash of
/// `input`.
///
/// The function is pure: identical inputs always yield identical digests, and
/// every input (including the empty string) is accepted.
///
/// # Example
/// ```
/// use pwhash::hash_password;
///
/// let digest = hash_password("angryMonkey");
/// assert_eq!(digest.as_str().len(), 88);
/// ```
pub fn hash_password(input: &str) -> Digest {
    let hash = Sha512::digest(input.as_bytes());
    Digest(STANDARD.encode(hash))
}
