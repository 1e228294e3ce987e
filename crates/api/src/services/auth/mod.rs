//! Authentication service.
//!
//! Provides password registration and login, and opaque bearer tokens for
//! the storefront to send on a customer's behalf.

mod error;

pub use error::AuthError;

use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use tienda_core::validation::{FieldContext, invalid_fields};
use tienda_core::wire::RegisterRequest;
use tienda_core::{Customer, Email};

use crate::db::users::NewUser;
use crate::db::{RepositoryError, TokenRepository, UserRepository};

/// Random bytes in an issued token.
const TOKEN_BYTES: usize = 32;

/// Authentication service.
///
/// Handles customer registration, login, token verification, and logout.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: TokenRepository<'a>,
    token_ttl: Duration,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, token_ttl: Duration) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens: TokenRepository::new(pool),
            token_ttl,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new customer and issue their first token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidFields` if any field fails its validator.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(Customer, String), AuthError> {
        validate_registration(request)?;
        let email = Email::parse(&request.email)?;
        let password_hash = hash_password(&request.password)?;

        let customer = self
            .users
            .create(&NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name: request.first_name.trim(),
                last_name: request.last_name.trim(),
                phone: non_blank(request.phone.as_deref()),
                rut: non_blank(request.rut.as_deref()),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let token = self.issue_token(&customer).await?;
        Ok((customer, token))
    }

    /// Login with email and password, issuing a new token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(Customer, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (customer, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.issue_token(&customer).await?;
        Ok((customer, token))
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// The customer a token belongs to, if it is known and unexpired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn authenticate(&self, token: &str) -> Result<Option<Customer>, AuthError> {
        Ok(self.tokens.find_customer(&hash_token(token)).await?)
    }

    /// Revoke a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        Ok(self.tokens.delete(&hash_token(token)).await?)
    }

    /// Drop tokens past their expiry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(self.tokens.delete_expired().await?)
    }

    async fn issue_token(&self, customer: &Customer) -> Result<String, AuthError> {
        let token = generate_token();
        let ttl = chrono::Duration::from_std(self.token_ttl).unwrap_or(chrono::Duration::days(7));
        self.tokens
            .insert(customer.id, &hash_token(&token), Utc::now() + ttl)
            .await?;
        Ok(token)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Check registration fields with the same validators the storefront uses.
fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
    let phone = request.phone.as_deref().unwrap_or_default().trim();
    let rut = request.rut.as_deref().unwrap_or_default().trim();
    let mut fields = vec![
        ("email", request.email.trim()),
        ("password", request.password.as_str()),
        ("confirm_password", request.confirm_password.as_str()),
        ("first_name", request.first_name.trim()),
        ("last_name", request.last_name.trim()),
    ];
    if !phone.is_empty() {
        fields.push(("phone", phone));
    }
    if !rut.is_empty() {
        fields.push(("rut", rut));
    }

    let invalid = invalid_fields(&fields, &FieldContext::with_password(&request.password));
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(AuthError::InvalidFields(
            invalid.into_iter().map(String::from).collect(),
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A new random URL-safe token.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hex digest of a token, as stored.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
