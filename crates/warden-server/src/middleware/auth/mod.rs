//! Bearer-token extraction and role gating.

pub mod extractor;
pub mod layer;
pub mod token;

pub use extractor::Auth;
pub use layer::{RoleGateLayer, RoleGateMiddleware};
pub use token::{extract_token, BearerToken};
