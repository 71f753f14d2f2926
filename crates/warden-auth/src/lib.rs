//! Session/token lifecycle and role-based authorization for Warden.
//!
//! Components, leaves first:
//!
//! - [`RoleRegistry`]: role id to privilege rank, loaded once.
//! - [`CredentialVerifier`]: argon2 password hashing and checking.
//! - [`TokenIssuer`]: signed, time-bounded HS256 tokens.
//! - [`SessionRegistry`]: which token ids are live, per user, over a
//!   pluggable [`SessionStore`].
//! - [`AuthorizationEngine`]: signature, expiry, liveness and rank checks.
//!
//! [`AuthService`] wires them together behind the public operations.

pub mod authorize;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod roles;
pub mod service;
pub mod session;
pub mod settings;
pub mod token;
pub mod types;
pub mod users;

pub use authorize::{AuthorizationEngine, Decision};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::CredentialVerifier;
pub use error::{AuthError, AuthResult, DenyReason, StoreError, StoreResult};
pub use roles::{default_roles, BuiltinRole, Role, RoleRegistry, RoleRegistryError};
pub use service::{AuthService, AuthServiceBuilder};
pub use session::{MemorySessionStore, RetryPolicy, SessionEntry, SessionRegistry, SessionStore};
#[cfg(feature = "redis")]
pub use session::{RedisSessionStore, RedisStoreConfig};
pub use settings::AuthSettings;
pub use token::{Claims, TokenIssuer, VerifiedToken};
pub use types::{IssuedToken, NewUser, Principal, Rank, RoleId, TokenId, User, UserId};
pub use users::{MemoryUserStore, UserStore};
pub use warden_common_secret::SecretString;
