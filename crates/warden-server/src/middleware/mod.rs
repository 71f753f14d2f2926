//! Middleware for the Warden API server.

pub mod auth;

pub use auth::{extract_token, Auth, BearerToken, RoleGateLayer, RoleGateMiddleware};
