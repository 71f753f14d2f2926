//! Secret handling for credential material.
//!
//! Signing keys and plaintext passwords travel through the system wrapped in
//! [`Secret`], which never prints, logs or serializes its contents and is
//! zeroized when dropped.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret value that is redacted in logs and debug output.
///
/// # Example
///
/// ```rust
/// use warden_common_secret::SecretString;
///
/// let password = SecretString::from("hunter2");
/// assert_eq!(format!("{}", password), "[REDACTED]");
/// assert_eq!(format!("{:?}", password), "Secret([REDACTED])");
///
/// // Explicit access required
/// assert_eq!(password.expose(), "hunter2");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Wrap a value.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the secret value.
    ///
    /// Keep the exposed reference on the stack of the call that needs it.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize + AsRef<[u8]>> Secret<T> {
    /// Raw bytes of the secret, for key derivation and hashing.
    pub fn expose_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Length in bytes, without exposing the content.
    pub fn len(&self) -> usize {
        self.0.as_ref().len()
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl<T: Zeroize + Default> Default for Secret<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

// Deserialize normally so config files and request bodies can carry secrets,
// but never write them back out.
impl<'de, T: Zeroize + Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Secret::new)
    }
}

impl<T: Zeroize> Serialize for Secret<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        "[REDACTED]".serialize(serializer)
    }
}

/// Type alias for a secret string.
pub type SecretString = Secret<String>;
