//! Rows and payloads exchanged with the account store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Registration source recorded when the client does not say otherwise.
pub const DEFAULT_SOURCE: &str = "web";

/// A stored account, as read back for login.
#[derive(Clone)]
pub struct Account {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password_hash", &"***")
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("date_of_birth", &self.date_of_birth)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Insert payload for a new account. The secret is already hashed.
#[derive(Clone)]
pub struct NewAccount {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password_hash", &"***")
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("date_of_birth", &self.date_of_birth)
            .finish()
    }
}

/// How the registration reached us; stored in `registration_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub source: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    #[must_use]
    pub fn web(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            ip_address,
            user_agent,
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::web(None, None)
    }
}

/// Result of the transactional two-table insert.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub registration_date: DateTime<Utc>,
    pub is_verified: bool,
}

/// Identity tuple returned by the uniqueness pre-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMatch {
    pub id: i32,
    pub email: String,
    pub username: String,
}

/// Account joined with its registration metadata, used by admin listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountSummary {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub registration_date: Option<DateTime<Utc>>,
    pub is_verified: Option<bool>,
    pub registration_source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RegistrationStats {
    pub total_users: i64,
    pub verified_users: i64,
    pub unverified_users: i64,
    pub users_last_7_days: i64,
    pub users_last_30_days: i64,
}
