//! Identifiers and value types shared by every component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Integer identifier newtype.
macro_rules! define_int_id {
    ($(#[$meta:meta])* $name:ident, $inner:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Wrap a raw value.
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// The raw value.
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }
    };
}

define_int_id!(
    /// Identifier of a registered user.
    UserId,
    i64
);
define_int_id!(
    /// Identifier of a role in the role registry.
    RoleId,
    i32
);
define_int_id!(
    /// Privilege rank. Lower values are more privileged.
    Rank,
    u32
);

impl Rank {
    /// Whether a holder of `self` may reach something gated at `required`.
    pub fn satisfies(self, required: Rank) -> bool {
        self.0 <= required.0
    }
}

/// Identifier of one token issuance (the JWT `jti`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(Uuid);

impl TokenId {
    /// Create a new random token id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from its string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

/// A registered user, as held by the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// PHC-formatted one-way hash of the password.
    pub password_hash: String,
    pub role_id: RoleId,
}

/// A user about to be created; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role_id: RoleId,
}

/// A freshly signed token handed back by login or refresh.
#[derive(Clone)]
pub struct IssuedToken {
    /// Encoded bearer token.
    pub token: String,
    pub token_id: TokenId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("token_id", &self.token_id)
            .field("user_id", &self.user_id)
            .field("role_id", &self.role_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identity resolved by a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub rank: Rank,
    pub token_id: TokenId,
    pub expires_at: DateTime<Utc>,
}
