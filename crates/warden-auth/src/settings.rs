//! Auth engine settings, loaded once at startup and immutable afterwards.

use crate::error::{AuthError, AuthResult};
use crate::roles::{default_roles, Role};
use serde::{Deserialize, Serialize};
use warden_common_secret::SecretString;

/// Settings for the auth engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC key used to sign tokens.
    pub signing_key: SecretString,
    /// Lifetime of an unrefreshed session, in seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Cap on concurrent sessions per user. `None` means unbounded.
    #[serde(default)]
    pub max_sessions_per_user: Option<usize>,
    /// Report expired/revoked/malformed distinctly to clients.
    #[serde(default)]
    pub expose_denial_reasons: bool,
    /// Role hierarchy.
    #[serde(default = "default_roles")]
    pub roles: Vec<Role>,
}

/// Longest accepted session TTL: one year.
pub const MAX_SESSION_TTL_SECS: u64 = 366 * 24 * 60 * 60;

fn default_session_ttl() -> u64 {
    3600 // 1 hour
}

impl AuthSettings {
    /// Settings with defaults for everything but the signing key.
    pub fn new(signing_key: impl Into<SecretString>) -> Self {
        Self {
            signing_key: signing_key.into(),
            session_ttl_secs: default_session_ttl(),
            max_sessions_per_user: None,
            expose_denial_reasons: false,
            roles: default_roles(),
        }
    }

    /// Set the session TTL.
    pub fn with_session_ttl_secs(mut self, secs: u64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    /// Cap concurrent sessions per user.
    pub fn with_max_sessions_per_user(mut self, cap: usize) -> Self {
        self.max_sessions_per_user = Some(cap);
        self
    }

    /// Session TTL as a duration. Values above [`MAX_SESSION_TTL_SECS`] are
    /// a configuration error.
    pub fn session_ttl(&self) -> AuthResult<chrono::Duration> {
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(AuthError::Config(format!(
                "session ttl {}s exceeds the maximum of {MAX_SESSION_TTL_SECS}s",
                self.session_ttl_secs
            )));
        }
        i64::try_from(self.session_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| AuthError::Config("session ttl out of range".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let settings: AuthSettings =
            serde_json::from_str(r#"{"signing_key": "0123456789abcdef0123456789abcdef"}"#).unwrap();
        assert_eq!(settings.session_ttl_secs, 3600);
        assert_eq!(settings.max_sessions_per_user, None);
        assert!(!settings.expose_denial_reasons);
        assert_eq!(settings.roles.len(), 3);
        assert_eq!(settings.signing_key.len(), 32);
    }

    #[test]
    fn test_serialize_redacts_signing_key() {
        let settings = AuthSettings::new("0123456789abcdef0123456789abcdef");
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("0123456789abcdef"));
    }

    #[test]
    fn test_custom_roles() {
        let settings: AuthSettings = serde_json::from_str(
            r#"{
                "signing_key": "k",
                "session_ttl_secs": 60,
                "roles": [{"id": 1, "name": "owner", "rank": 1}]
            }"#,
        )
        .unwrap();
        assert_eq!(settings.session_ttl().unwrap(), chrono::Duration::seconds(60));
        assert_eq!(settings.roles[0].name, "owner");
    }

    #[test]
    fn test_oversized_ttl_is_a_config_error() {
        let at_limit = AuthSettings::new("k").with_session_ttl_secs(MAX_SESSION_TTL_SECS);
        assert!(at_limit.session_ttl().is_ok());

        for secs in [MAX_SESSION_TTL_SECS + 1, 10_000_000_000_000, 1 << 60, u64::MAX] {
            let settings = AuthSettings::new("k").with_session_ttl_secs(secs);
            assert!(matches!(settings.session_ttl(), Err(AuthError::Config(_))));
        }
    }
}
