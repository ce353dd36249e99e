//! Patron model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

/// Patron role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Librarian,
    Patron,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Librarian => "LIBRARIAN",
            Role::Patron => "PATRON",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LIBRARIAN" => Ok(Role::Librarian),
            "PATRON" => Ok(Role::Patron),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// Stored as TEXT
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Patron record from the patron ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Patron {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
}

/// New patron (account management itself lives outside this server)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePatron {
    #[validate(length(min = 1, message = "Name cannot be blank"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone cannot be blank"))]
    pub phone: String,
    pub role: Role,
}

/// How a caller identifies the patron a borrow is made for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatronIdentity {
    Id(i64),
    Email(String),
}

impl std::fmt::Display for PatronIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatronIdentity::Id(id) => write!(f, "{}", id),
            PatronIdentity::Email(email) => write!(f, "{}", email),
        }
    }
}
