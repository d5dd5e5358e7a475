//! Account store: the `users` and `registration_info` tables.
//!
//! [`AccountStore`] is the seam between the service layer and persistence.
//! [`PgAccountStore`] is the production implementation; [`MemoryAccountStore`]
//! keeps the same invariants in process and is used by tests.
//!
//! The uniqueness constraints on `email` and `username` are the authority on
//! duplicates. [`AccountStore::exists_by_email_or_username`] only produces a
//! friendlier error earlier and can race with a concurrent registration.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryAccountStore;
pub use self::models::{
    Account, AccountSummary, ClientInfo, CreatedAccount, IdentityMatch, NewAccount,
    RegistrationStats,
};
pub use self::postgres::PgAccountStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Email or username already taken; carries the violated constraint name.
    #[error("unique constraint violated: {0}")]
    ConstraintViolation(String),

    /// A statement inside the registration transaction failed; the transaction was rolled back.
    #[error("transaction failed during {context}")]
    Transaction {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert the account and its registration metadata in one transaction.
    async fn create_account(
        &self,
        account: NewAccount,
        client: ClientInfo,
    ) -> Result<CreatedAccount>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Accounts already holding `email` or `username`.
    async fn exists_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Vec<IdentityMatch>>;

    /// All accounts, newest first.
    async fn list_all(&self) -> Result<Vec<AccountSummary>>;

    /// Case-insensitive substring match on full name, email or username, newest first.
    async fn search(&self, term: &str) -> Result<Vec<AccountSummary>>;

    async fn registration_stats(&self) -> Result<RegistrationStats>;

    async fn ping(&self) -> Result<()>;
}

/// SQLSTATE 23505 (`unique_violation`).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Escape `LIKE` metacharacters so the term matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
