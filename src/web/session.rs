//! Admin login session carried in a single signed cookie.
//!
//! The cookie value is a keyed BLAKE3 hash of a fixed marker. Only a
//! holder of the configured secret can produce it, so verifying a session
//! is a recomputation.

use axum::http::{header, HeaderMap};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "certa_session";

const KEY_CONTEXT: &str = "certa-painel admin session v1";
const SESSION_MARKER: &[u8] = b"logged_in=true";

/// Key used to sign and verify the session cookie.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; 32],
}

impl SessionKey {
    /// Derive the signing key from the configured secret.
    pub fn derive(secret: &str) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
        }
    }

    fn token(&self) -> blake3::Hash {
        blake3::keyed_hash(&self.key, SESSION_MARKER)
    }

    /// Whether a cookie value was produced with this key.
    pub fn verify(&self, value: &str) -> bool {
        // Hash equality is constant-time.
        blake3::Hash::from_hex(value.trim()).is_ok_and(|hash| hash == self.token())
    }

    /// `Set-Cookie` value that opens a session.
    pub fn login_cookie(&self) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/",
            SESSION_COOKIE,
            self.token().to_hex()
        )
    }

    /// Whether the request carries a valid session cookie.
    pub fn is_logged_in(&self, headers: &HeaderMap) -> bool {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == SESSION_COOKIE && self.verify(value))
    }
}

// Keep the key out of debug output.
impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// `Set-Cookie` value that ends the session.
pub fn logout_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    )
}
