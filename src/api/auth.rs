//! Bearer token claims
//!
//! Tokens are issued by the external account service; this server only
//! verifies them and reads the caller's identity and role.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{Patron, PatronIdentity, Role},
};

/// JWT claims for authenticated patrons and librarians
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatronClaims {
    /// Patron email
    pub sub: String,
    pub patron_id: i64,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl PatronClaims {
    pub fn for_patron(patron: &Patron, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: patron.email.clone(),
            patron_id: patron.id,
            role: patron.role,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// The caller, as the engine identifies patrons
    pub fn identity(&self) -> PatronIdentity {
        PatronIdentity::Email(self.sub.clone())
    }

    pub fn is_librarian(&self) -> bool {
        self.role == Role::Librarian
    }

    pub fn require_librarian(&self) -> Result<(), AppError> {
        if self.is_librarian() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian role required".to_string()))
        }
    }
}
