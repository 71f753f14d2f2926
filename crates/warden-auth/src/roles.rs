//! Role definitions and the static role registry.

use crate::error::{AuthError, AuthResult};
use crate::types::{Rank, RoleId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The roles every deployment knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinRole {
    Admin,
    Moderator,
    User,
}

impl BuiltinRole {
    /// All builtin roles, most privileged first.
    pub const ALL: [BuiltinRole; 3] = [Self::Admin, Self::Moderator, Self::User];

    /// Fixed role id.
    pub const fn id(self) -> RoleId {
        match self {
            Self::Admin => RoleId::new(1),
            Self::Moderator => RoleId::new(2),
            Self::User => RoleId::new(3),
        }
    }

    /// Default rank.
    pub const fn rank(self) -> Rank {
        match self {
            Self::Admin => Rank::new(1),
            Self::Moderator => Rank::new(2),
            Self::User => Rank::new(3),
        }
    }

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::User => "user",
        }
    }

    /// Look up a builtin role by id.
    pub fn from_id(id: RoleId) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.id() == id)
    }

    /// The registry entry for this role.
    pub fn definition(self) -> Role {
        Role {
            id: self.id(),
            name: self.name().to_string(),
            rank: self.rank(),
        }
    }
}

/// A role as loaded into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub rank: Rank,
}

/// Default role hierarchy.
pub fn default_roles() -> Vec<Role> {
    BuiltinRole::ALL.into_iter().map(BuiltinRole::definition).collect()
}

/// Role registry load errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleRegistryError {
    #[error("duplicate role id: {0}")]
    DuplicateId(RoleId),

    #[error("role registry is empty")]
    Empty,
}

/// Read-only mapping of role id to rank, loaded once at startup.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: HashMap<RoleId, Role>,
}

impl RoleRegistry {
    /// Load from a role list. Ids must be unique.
    pub fn load(roles: impl IntoIterator<Item = Role>) -> Result<Self, RoleRegistryError> {
        let mut map = HashMap::new();
        for role in roles {
            let id = role.id;
            if map.insert(id, role).is_some() {
                return Err(RoleRegistryError::DuplicateId(id));
            }
        }

        if map.is_empty() {
            return Err(RoleRegistryError::Empty);
        }

        Ok(Self { roles: map })
    }

    /// Registry with the three builtin roles.
    pub fn builtin() -> Self {
        Self {
            roles: default_roles().into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Rank of a role. Unknown ids are a hard error, never a default grant.
    pub fn rank_of(&self, id: RoleId) -> AuthResult<Rank> {
        self.roles
            .get(&id)
            .map(|role| role.rank)
            .ok_or(AuthError::UnknownRole(id))
    }

    pub fn get(&self, id: RoleId) -> Option<&Role> {
        self.roles.get(&id)
    }

    pub fn contains(&self, id: RoleId) -> bool {
        self.roles.contains_key(&id)
    }

    /// Roles ordered from most to least privileged.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        let mut roles: Vec<&Role> = self.roles.values().collect();
        roles.sort_by_key(|role| (role.rank, role.id));
        roles.into_iter()
    }

    /// Whether `held` may reach an endpoint gated at `required`.
    pub fn permits(&self, held: RoleId, required: RoleId) -> AuthResult<bool> {
        let held_rank = self.rank_of(held)?;
        let required_rank = self.rank_of(required)?;
        Ok(held_rank.satisfies(required_rank))
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
