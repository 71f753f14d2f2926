//! Request data transfer objects.

use crate::error::ApiError;
use serde::Deserialize;
use std::collections::HashMap;
use validator::{Validate, ValidationError, ValidationErrors};
use warden_auth::{RoleId, SecretString};

/// Body of `POST /register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 64, message = "must be 1 to 64 characters"))]
    pub username: String,
    #[validate(custom(function = "not_empty_secret"))]
    pub password: SecretString,
    pub role: RoleId,
}

/// Body of `POST /login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub username: String,
    pub password: SecretString,
}

fn not_empty_secret(value: &SecretString) -> Result<(), ValidationError> {
    if value.is_empty() {
        let mut err = ValidationError::new("length");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let fields: HashMap<String, Vec<String>> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        ApiError::ValidationError(fields)
    }
}
