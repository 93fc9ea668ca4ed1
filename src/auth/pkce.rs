//! PKCE S256 pairs and random tokens for the federated sign-in flow
//!
//! The identity service expects `code_challenge_method=s256` on the authorize
//! URL and the matching `code_verifier` when the returned code is exchanged
//! for a session (RFC 7636).

use base64::Engine as _;
use rand::RngCore as _;
use sha2::{Digest, Sha256};

/// Challenge method sent on the authorize URL
pub const CHALLENGE_METHOD: &str = "s256";

// ---------------------------------------------------------------------------
// PkceChallenge
// ---------------------------------------------------------------------------

/// A verifier and its derived S256 challenge
///
/// # Examples
///
/// ```
/// use lesson_forge::auth::pkce::PkceChallenge;
///
/// let pkce = PkceChallenge::generate();
/// assert_eq!(pkce.verifier.len(), 43);
/// assert_ne!(pkce.verifier, pkce.challenge);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    /// Base64url (no padding) encoding of 32 random bytes; sent at code exchange
    pub verifier: String,

    /// Base64url (no padding) SHA-256 of the verifier; sent on the authorize URL
    pub challenge: String,
}

impl PkceChallenge {
    /// Generates a fresh verifier/challenge pair
    pub fn generate() -> Self {
        let verifier = random_token(32);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// S256 challenge for a verifier
///
/// # Examples
///
/// ```
/// use lesson_forge::auth::pkce::challenge_for;
///
/// // RFC 7636 appendix B
/// assert_eq!(
///     challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
/// );
/// ```
pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

/// URL-safe random token of `bytes` bytes of entropy
///
/// Used for PKCE verifiers, OAuth `state` values and session cookie ids.
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}
