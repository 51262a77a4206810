//! HTTP Basic credentials

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pxy_core::Auth;
use subtle::ConstantTimeEq;

/// Credentials carried by an `Authorization: Basic ...` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub password: String,
}

impl BasicCredentials {
    /// Extract credentials from request headers, if well-formed
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = header.trim().split_once(' ')?;

        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;

        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    /// Compare against configured credentials in constant time
    pub fn matches(&self, auth: &Auth) -> bool {
        let user = self.user.as_bytes().ct_eq(auth.user.as_bytes());
        let password = self.password.as_bytes().ct_eq(auth.password.as_bytes());
        (user & password).into()
    }
}
