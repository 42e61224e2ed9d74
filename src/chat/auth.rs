//! Credential check for the chat front end
//!
//! A single hardcoded credential pair guards the development deployment.
//! This is a stand-in, not an access-control mechanism: there is no lockout,
//! no rate limiting, and no credential store.

use tracing::warn;

/// Role attached to an authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
}

/// An authenticated chat identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub role: Role,
    pub provider: &'static str,
}

/// Check a credential pair; only `("admin", "admin")` yields an identity.
pub fn authenticate(username: &str, password: &str) -> Option<Identity> {
    if (username, password) == ("admin", "admin") {
        Some(Identity {
            username: "admin".to_string(),
            role: Role::Admin,
            provider: "credentials",
        })
    } else {
        warn!("rejected credentials for {:?}", username);
        None
    }
}
