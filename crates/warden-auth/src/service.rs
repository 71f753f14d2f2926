//! The auth service facade.

use crate::authorize::{AuthorizationEngine, Decision};
use crate::clock::{Clock, SystemClock};
use crate::credentials::CredentialVerifier;
use crate::error::{AuthError, AuthResult};
use crate::roles::RoleRegistry;
use crate::session::{MemorySessionStore, RetryPolicy, SessionEntry, SessionRegistry, SessionStore};
use crate::settings::AuthSettings;
use crate::token::{TokenIssuer, VerifiedToken};
use crate::types::{IssuedToken, NewUser, RoleId, User, UserId};
use crate::users::{MemoryUserStore, UserStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use warden_common_secret::SecretString;

/// Registration, login, token lifecycle and authorization in one place.
///
/// `Send + Sync`; share it as `Arc<AuthService>`.
pub struct AuthService {
    roles: Arc<RoleRegistry>,
    credentials: Arc<CredentialVerifier>,
    issuer: Arc<TokenIssuer>,
    sessions: SessionRegistry,
    engine: AuthorizationEngine,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    expose_denial_reasons: bool,
}

impl AuthService {
    /// Start building a service from settings.
    pub fn builder(settings: AuthSettings) -> AuthServiceBuilder {
        AuthServiceBuilder::new(settings)
    }

    /// Register a new user. The role must exist.
    #[instrument(skip(self, password), fields(role = %role_id))]
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
        role_id: RoleId,
    ) -> AuthResult<User> {
        if !self.roles.contains(role_id) {
            return Err(AuthError::UnknownRole(role_id));
        }

        let password_hash = self.hash_password(password).await?;
        let user = self
            .users
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                role_id,
            })
            .await?;

        info!(event = "user_registered", user_id = %user.id, role = %role_id, "User registered");
        Ok(user)
    }

    /// Check credentials and open a new session.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &SecretString) -> AuthResult<IssuedToken> {
        let user = self.users.lookup_user(username).await?;
        // Unknown users still pay for one verification.
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = self.verify_password(password, stored_hash).await?;
        let user = match user {
            Some(user) if verified => user,
            _ => {
                info!(event = "login_failed", "Login failed");
                return Err(AuthError::Unauthenticated);
            }
        };

        if !self.roles.contains(user.role_id) {
            return Err(AuthError::UnknownRole(user.role_id));
        }

        let issued = self.issuer.issue(user.id, user.role_id, self.clock.now())?;
        self.sessions
            .add(issued.user_id, issued.token_id, issued.expires_at)
            .await?;

        info!(
            event = "login",
            user_id = %issued.user_id,
            token_id = %issued.token_id,
            "Session opened"
        );
        Ok(issued)
    }

    /// Extend a live token. The token id stays the same and the expiry moves
    /// strictly forward.
    pub async fn refresh_token(&self, token: &str) -> AuthResult<IssuedToken> {
        let current = self.validate(token).await?;
        let now = self.clock.now();
        let target = self.issuer.expiry_from(now)?;
        // The registry decides the expiry so that older token texts of the
        // same session can never pull it backward.
        let expires_at = self
            .sessions
            .refresh(current.user_id, current.token_id, target)
            .await?;
        let refreshed = self.issuer.reissue(&current, now, expires_at)?;

        debug!(
            user_id = %refreshed.user_id,
            token_id = %refreshed.token_id,
            expires_at = %refreshed.expires_at,
            "Token refreshed"
        );
        Ok(refreshed)
    }

    /// End the session behind `token`.
    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        let current = self.validate(token).await?;
        self.sessions
            .revoke_one(current.user_id, current.token_id)
            .await
    }

    /// End every session of the user behind `token`. Returns how many ended.
    pub async fn logout_all(&self, token: &str) -> AuthResult<usize> {
        let current = self.validate(token).await?;
        self.sessions.revoke_all(current.user_id).await
    }

    /// Decide whether `token` may reach something gated at `required`.
    pub async fn authorize(&self, token: &str, required: RoleId) -> AuthResult<Decision> {
        self.engine.authorize(token, required).await
    }

    /// Live sessions of a user.
    pub async fn sessions(&self, user_id: UserId) -> AuthResult<Vec<SessionEntry>> {
        self.sessions.sessions(user_id).await
    }

    /// Purge expired sessions in the background.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.sessions.spawn_sweeper(interval)
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Whether clients should see distinct denial reasons.
    pub fn expose_denial_reasons(&self) -> bool {
        self.expose_denial_reasons
    }

    /// Argon2 is CPU-bound, so it runs on the blocking pool.
    async fn hash_password(&self, password: &SecretString) -> AuthResult<String> {
        let credentials = self.credentials.clone();
        let password = password.clone();
        tokio::task::spawn_blocking(move || credentials.hash(&password))
            .await
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?
    }

    /// Check `password` against `stored_hash`, or burn one verification
    /// against the dummy hash when there is none.
    async fn verify_password(
        &self,
        password: &SecretString,
        stored_hash: Option<String>,
    ) -> AuthResult<bool> {
        let credentials = self.credentials.clone();
        let password = password.clone();
        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => credentials.verify(&password, &hash),
            None => credentials.reject(&password),
        })
        .await
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Full validity check for token-bearing operations.
    async fn validate(&self, token: &str) -> AuthResult<VerifiedToken> {
        match self.engine.validate(token).await? {
            Ok(verified) => Ok(verified),
            Err(reason) => {
                debug!(reason = %reason, "Rejected token");
                Err(AuthError::InvalidToken)
            }
        }
    }
}

/// Builder for [`AuthService`]. Unset collaborators default to in-memory
/// stores and the system clock.
pub struct AuthServiceBuilder {
    settings: AuthSettings,
    users: Option<Arc<dyn UserStore>>,
    sessions: Option<Arc<dyn SessionStore>>,
    clock: Option<Arc<dyn Clock>>,
    credentials: Option<CredentialVerifier>,
    retry: RetryPolicy,
}

impl AuthServiceBuilder {
    pub fn new(settings: AuthSettings) -> Self {
        Self {
            settings,
            users: None,
            sessions: None,
            clock: None,
            credentials: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn user_store(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn credentials(mut self, credentials: CredentialVerifier) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate settings and wire the components together.
    pub fn build(self) -> AuthResult<AuthService> {
        let roles = Arc::new(
            RoleRegistry::load(self.settings.roles.iter().cloned())
                .map_err(|e| AuthError::Config(e.to_string()))?,
        );
        let issuer = Arc::new(TokenIssuer::new(
            &self.settings.signing_key,
            self.settings.session_ttl()?,
        )?);
        let credentials = Arc::new(match self.credentials {
            Some(credentials) => credentials,
            None => CredentialVerifier::new()?,
        });
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let store: Arc<dyn SessionStore> = match self.sessions {
            Some(store) => store,
            None => Arc::new(MemorySessionStore::new()),
        };
        let users: Arc<dyn UserStore> = match self.users {
            Some(users) => users,
            None => Arc::new(MemoryUserStore::new()),
        };

        let sessions = SessionRegistry::new(store, clock.clone())
            .with_retry(self.retry)
            .with_max_sessions_per_user(self.settings.max_sessions_per_user);
        let engine = AuthorizationEngine::new(
            issuer.clone(),
            sessions.clone(),
            roles.clone(),
            clock.clone(),
        );

        Ok(AuthService {
            roles,
            credentials,
            issuer,
            sessions,
            engine,
            users,
            clock,
            expose_denial_reasons: self.settings.expose_denial_reasons,
        })
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("roles", &self.roles)
            .field("issuer", &self.issuer)
            .field("sessions", &self.sessions)
            .field("expose_denial_reasons", &self.expose_denial_reasons)
            .finish_non_exhaustive()
    }
}
