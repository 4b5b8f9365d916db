//! Caller credentials.
//!
//! Token issuance happens elsewhere; here a credential is just the opaque
//! bearer string the caller presents.

use std::fmt;

/// Opaque bearer credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Parses an `Authorization` header value (`Bearer <token>`).
    pub fn from_authorization_header(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then(|| Self::bearer(token))
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Who a credential resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    /// Staff principals may perform catalog-admin actions.
    pub is_staff: bool,
}

impl Principal {
    pub fn staff(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_staff: true,
        }
    }

    pub fn customer(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_staff: false,
        }
    }
}
