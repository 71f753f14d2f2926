//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::Arc;
use warden_auth::{
    AuthService, AuthSettings, CredentialVerifier, ManualClock, MemorySessionStore, SecretString,
};

pub const SIGNING_KEY: &str = "integration-test-signing-key-0123456789";

/// Cheap argon2 parameters so tests don't spend their time hashing.
pub fn fast_credentials() -> CredentialVerifier {
    let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
    CredentialVerifier::with_argon2(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
        .expect("dummy hash")
}

pub struct Harness {
    pub service: Arc<AuthService>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemorySessionStore>,
}

pub fn harness(settings: AuthSettings) -> Harness {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(MemorySessionStore::new());
    let service = AuthService::builder(settings)
        .clock(clock.clone())
        .session_store(store.clone())
        .credentials(fast_credentials())
        .build()
        .expect("service builds");

    Harness {
        service: Arc::new(service),
        clock,
        store,
    }
}

pub fn default_harness() -> Harness {
    harness(AuthSettings::new(SIGNING_KEY))
}

pub fn pw(s: &str) -> SecretString {
    SecretString::from(s)
}
