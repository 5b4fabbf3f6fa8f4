//! ABOUTME: Authentication utilities for password hashing and JWT operations
//! ABOUTME: Argon2 password hashes and HS256 tokens carrying the user id

use crate::models::Claims;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use ly_core::{Error, Result};
use rand_core::OsRng;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

/// Password hashing utilities
pub struct PasswordAuth;

impl PasswordAuth {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("Failed to hash password: {}", e)))?
            .to_string();

        debug!("Password hashed successfully");
        Ok(password_hash)
    }

    /// Verify a password against a stored hash
    #[instrument(skip(password, hash))]
    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("Invalid password hash format: {}", e)))?;

        let valid = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();
        debug!("Password verification result: {}", valid);
        Ok(valid)
    }
}

/// JWT token utilities
pub struct JwtAuth;

impl JwtAuth {
    /// Lifetime used when the user asks to be remembered
    pub const REMEMBER_ME_SECS: u64 = 30 * 24 * 60 * 60;

    #[instrument(skip(secret))]
    pub fn create_token(user_id: &str, username: &str, secret: &str, ttl_secs: u64) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Config(format!("Time error: {}", e)))?
            .as_secs() as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: now + ttl_secs as usize,
            iat: now,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .map_err(|e| Error::Config(format!("Failed to create JWT: {}", e)))?;

        debug!("JWT token created for user: {}", user_id);
        Ok(token)
    }

    #[instrument(skip(token, secret))]
    pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| Error::Unauthorized(format!("Invalid JWT: {}", e)))?;

        Ok(token_data.claims)
    }
}
