//! Session registry and its backing stores.
//!
//! The registry is the authority on which issued tokens are still valid.
//! Everything it knows is keyed by user id, and every mutation is a single
//! atomic operation on the backing store, so concurrent logins, refreshes
//! and logouts for one user linearize.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod registry;
pub mod retry;
pub mod store;

pub use memory::MemorySessionStore;
#[cfg(feature = "redis")]
pub use self::redis::{RedisSessionStore, RedisStoreConfig};
pub use registry::SessionRegistry;
pub use retry::RetryPolicy;
pub use store::{SessionEntry, SessionStore};
