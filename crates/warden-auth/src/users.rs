//! User lookup collaborator.

use crate::error::{AuthError, AuthResult};
use crate::types::{NewUser, User, UserId};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Keyed user storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by username.
    async fn lookup_user(&self, username: &str) -> AuthResult<Option<User>>;

    /// Create a user. Usernames are unique; a taken one is
    /// `DuplicateUsername`.
    async fn create_user(&self, new_user: NewUser) -> AuthResult<User>;
}

/// In-process user store.
#[derive(Debug)]
pub struct MemoryUserStore {
    by_username: DashMap<String, User>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            by_username: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.by_username.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_username.is_empty()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn lookup_user(&self, username: &str) -> AuthResult<Option<User>> {
        Ok(self.by_username.get(username).map(|user| user.clone()))
    }

    async fn create_user(&self, new_user: NewUser) -> AuthResult<User> {
        match self.by_username.entry(new_user.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateUsername(new_user.username)),
            Entry::Vacant(slot) => {
                let user = User {
                    id: UserId::new(self.next_id.fetch_add(1, Ordering::Relaxed)),
                    username: new_user.username,
                    password_hash: new_user.password_hash,
                    role_id: new_user.role_id,
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoleId;
    use std::sync::Arc;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role_id: RoleId::new(3),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = MemoryUserStore::new();
        let alice = store.create_user(new_user("alice")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();

        assert_ne!(alice.id, bob.id);
        assert_eq!(store.lookup_user("alice").await.unwrap(), Some(alice));
        assert_eq!(store.lookup_user("carol").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername(name) if name == "alice"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_has_one_winner() {
        let store = Arc::new(MemoryUserStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create_user(new_user("alice")).await.is_ok() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
