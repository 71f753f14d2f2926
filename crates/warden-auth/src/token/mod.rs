//! Signed, time-bounded bearer tokens.

pub mod claims;
pub mod issuer;

pub use claims::{Claims, VerifiedToken};
pub use issuer::TokenIssuer;
