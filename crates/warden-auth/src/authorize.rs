//! Authorization decisions.

use crate::clock::Clock;
use crate::error::{AuthError, AuthResult, DenyReason};
use crate::roles::RoleRegistry;
use crate::session::SessionRegistry;
use crate::token::{TokenIssuer, VerifiedToken};
use crate::types::{Principal, Rank, RoleId};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Principal),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// The principal on allow, the reason as an error on deny.
    pub fn into_result(self) -> AuthResult<Principal> {
        match self {
            Self::Allow(principal) => Ok(principal),
            Self::Deny(reason) => Err(AuthError::Denied(reason)),
        }
    }
}

/// Decides whether a bearer token may reach something gated at a role.
///
/// Checks run in a fixed order and stop at the first failure:
/// signature, expiry, liveness in the session registry, then role rank.
/// Never mutates state.
#[derive(Debug, Clone)]
pub struct AuthorizationEngine {
    issuer: Arc<TokenIssuer>,
    sessions: SessionRegistry,
    roles: Arc<RoleRegistry>,
    clock: Arc<dyn Clock>,
}

impl AuthorizationEngine {
    pub fn new(
        issuer: Arc<TokenIssuer>,
        sessions: SessionRegistry,
        roles: Arc<RoleRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            issuer,
            sessions,
            roles,
            clock,
        }
    }

    /// Full token validity: signature, expiry and liveness. No role check.
    ///
    /// `Ok(Err(reason))` is a definite "invalid"; `Err` means the session
    /// store could not answer.
    pub async fn validate(&self, token: &str) -> AuthResult<Result<VerifiedToken, DenyReason>> {
        let verified = match self.issuer.decode(token) {
            Ok(verified) => verified,
            Err(_) => return Ok(Err(DenyReason::Unauthenticated)),
        };

        if verified.is_expired_at(self.clock.now()) {
            return Ok(Err(DenyReason::TokenExpired));
        }

        if !self
            .sessions
            .is_live(verified.user_id, verified.token_id)
            .await?
        {
            return Ok(Err(DenyReason::TokenRevoked));
        }

        Ok(Ok(verified))
    }

    /// Decide whether `token` may reach an endpoint gated at `required`.
    pub async fn authorize(&self, token: &str, required: RoleId) -> AuthResult<Decision> {
        let verified = match self.validate(token).await? {
            Ok(verified) => verified,
            Err(reason) => {
                info!(
                    event = "authz_denied",
                    required_role = %required,
                    reason = %reason,
                    "Authorization denied"
                );
                return Ok(Decision::Deny(reason));
            }
        };

        let decision = match self.check_rank(verified.role_id, required) {
            Ok(rank) => Decision::Allow(Principal {
                user_id: verified.user_id,
                role_id: verified.role_id,
                rank,
                token_id: verified.token_id,
                expires_at: verified.expires_at,
            }),
            Err(reason) => Decision::Deny(reason),
        };

        match &decision {
            Decision::Allow(principal) => debug!(
                event = "authz_granted",
                user_id = %principal.user_id,
                token_id = %principal.token_id,
                required_role = %required,
                "Authorization granted"
            ),
            Decision::Deny(reason) => info!(
                event = "authz_denied",
                user_id = %verified.user_id,
                token_id = %verified.token_id,
                role = %verified.role_id,
                required_role = %required,
                reason = %reason,
                "Authorization denied"
            ),
        }

        Ok(decision)
    }

    fn check_rank(&self, held: RoleId, required: RoleId) -> Result<Rank, DenyReason> {
        let held_rank = self
            .roles
            .rank_of(held)
            .map_err(|_| DenyReason::UnknownRole)?;
        let required_rank = self
            .roles
            .rank_of(required)
            .map_err(|_| DenyReason::UnknownRole)?;

        if held_rank.satisfies(required_rank) {
            Ok(held_rank)
        } else {
            Err(DenyReason::InsufficientRole)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::roles::BuiltinRole;
    use crate::session::store::MockSessionStore;
    use crate::session::{MemorySessionStore, RetryPolicy};
    use crate::types::UserId;
    use chrono::Duration;
    use test_case::test_case;
    use warden_common_secret::SecretString;

    struct Fixture {
        engine: AuthorizationEngine,
        issuer: Arc<TokenIssuer>,
        sessions: SessionRegistry,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let issuer = Arc::new(
            TokenIssuer::new(
                &SecretString::from("0123456789abcdef0123456789abcdef"),
                Duration::hours(1),
            )
            .unwrap(),
        );
        let sessions = SessionRegistry::new(Arc::new(MemorySessionStore::new()), clock.clone());
        let engine = AuthorizationEngine::new(
            issuer.clone(),
            sessions.clone(),
            Arc::new(RoleRegistry::builtin()),
            clock.clone(),
        );
        Fixture {
            engine,
            issuer,
            sessions,
            clock,
        }
    }

    async fn login(f: &Fixture, role: BuiltinRole) -> String {
        let issued = f.issuer.issue(UserId::new(1), role.id(), f.clock.now()).unwrap();
        f.sessions
            .add(issued.user_id, issued.token_id, issued.expires_at)
            .await
            .unwrap();
        issued.token
    }

    #[test_case(BuiltinRole::Admin, BuiltinRole::Moderator, true; "admin reaches moderator")]
    #[test_case(BuiltinRole::Admin, BuiltinRole::User, true; "admin reaches user")]
    #[test_case(BuiltinRole::Moderator, BuiltinRole::Admin, false; "moderator blocked from admin")]
    #[test_case(BuiltinRole::User, BuiltinRole::Admin, false; "user blocked from admin")]
    #[test_case(BuiltinRole::User, BuiltinRole::User, true; "user reaches user")]
    #[tokio::test]
    async fn test_role_gate(held: BuiltinRole, required: BuiltinRole, allowed: bool) {
        let f = fixture();
        let token = login(&f, held).await;
        let decision = f.engine.authorize(&token, required.id()).await.unwrap();
        if allowed {
            assert!(decision.is_allowed());
        } else {
            assert_eq!(decision, Decision::Deny(DenyReason::InsufficientRole));
        }
    }

    #[tokio::test]
    async fn test_allow_carries_principal() {
        let f = fixture();
        let token = login(&f, BuiltinRole::Moderator).await;

        match f.engine.authorize(&token, BuiltinRole::User.id()).await.unwrap() {
            Decision::Allow(principal) => {
                assert_eq!(principal.user_id, UserId::new(1));
                assert_eq!(principal.role_id, BuiltinRole::Moderator.id());
                assert_eq!(principal.rank, BuiltinRole::Moderator.rank());
            }
            other => panic!("expected allow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_token_is_unauthenticated() {
        let f = fixture();
        let decision = f.engine.authorize("garbage", BuiltinRole::User.id()).await.unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let f = fixture();
        let token = login(&f, BuiltinRole::User).await;
        f.clock.advance(Duration::hours(1));

        let decision = f.engine.authorize(&token, BuiltinRole::User.id()).await.unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::TokenExpired));
    }

    #[tokio::test]
    async fn test_revoked_token() {
        let f = fixture();
        let token = login(&f, BuiltinRole::User).await;
        let verified = f.issuer.decode(&token).unwrap();
        f.sessions
            .revoke_one(verified.user_id, verified.token_id)
            .await
            .unwrap();

        let decision = f.engine.authorize(&token, BuiltinRole::User.id()).await.unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::TokenRevoked));
    }

    #[tokio::test]
    async fn test_signed_but_never_registered_is_revoked() {
        let f = fixture();
        let issued = f
            .issuer
            .issue(UserId::new(9), BuiltinRole::Admin.id(), f.clock.now())
            .unwrap();

        let decision = f.engine.authorize(&issued.token, BuiltinRole::User.id()).await.unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::TokenRevoked));
    }

    #[tokio::test]
    async fn test_unknown_roles_are_denied() {
        let f = fixture();
        let token = login(&f, BuiltinRole::Admin).await;
        let decision = f.engine.authorize(&token, RoleId::new(42)).await.unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::UnknownRole));

        let issued = f.issuer.issue(UserId::new(2), RoleId::new(42), f.clock.now()).unwrap();
        f.sessions
            .add(issued.user_id, issued.token_id, issued.expires_at)
            .await
            .unwrap();
        let decision = f
            .engine
            .authorize(&issued.token, BuiltinRole::User.id())
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::UnknownRole));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_deny() {
        let f = fixture();
        let token = login(&f, BuiltinRole::User).await;

        let mut store = MockSessionStore::new();
        store
            .expect_contains_live()
            .returning(|_, _, _| Err(StoreError::Unavailable("down".into())));
        let sessions = SessionRegistry::new(Arc::new(store), f.clock.clone())
            .with_retry(RetryPolicy::no_retry());
        let engine = AuthorizationEngine::new(
            f.issuer.clone(),
            sessions,
            Arc::new(RoleRegistry::builtin()),
            f.clock.clone(),
        );

        let result = engine.authorize(&token, BuiltinRole::User.id()).await;
        assert!(matches!(result, Err(AuthError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_expiry_checked_before_liveness() {
        let f = fixture();
        let token = login(&f, BuiltinRole::User).await;

        // A store that must never be consulted.
        let mut store = MockSessionStore::new();
        store.expect_contains_live().never();
        let engine = AuthorizationEngine::new(
            f.issuer.clone(),
            SessionRegistry::new(Arc::new(store), f.clock.clone()),
            Arc::new(RoleRegistry::builtin()),
            f.clock.clone(),
        );
        f.clock.advance(Duration::hours(2));

        let decision = engine.authorize(&token, BuiltinRole::User.id()).await.unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::TokenExpired));
    }
}
