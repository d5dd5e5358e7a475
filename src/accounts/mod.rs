//! Registration and login.
//!
//! [`AccountService`] validates input, hashes and verifies credentials, and
//! drives an [`AccountStore`]. It holds no per-request state.

mod error;
mod password;
mod types;

pub use self::error::AuthError;
pub use self::password::CredentialHasher;
pub use self::types::{
    AccountProfile, MAX_EMAIL_LENGTH, MAX_FULL_NAME_LENGTH, MAX_PHONE_LENGTH,
    MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, MSG_EMAIL_TOO_LONG, MSG_FIELDS_REQUIRED,
    MSG_FULL_NAME_TOO_LONG, MSG_INVALID_DATE_OF_BIRTH, MSG_LOGIN_FIELDS_REQUIRED,
    MSG_PASSWORD_TOO_SHORT, MSG_PHONE_TOO_LONG, MSG_SEARCH_REQUIRED, MSG_USERNAME_TOO_LONG,
    Registration,
};

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::store::{
    AccountStore, AccountSummary, ClientInfo, CreatedAccount, NewAccount, RegistrationStats,
    StoreError,
};

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    hasher: Arc<CredentialHasher>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// # Errors
    /// Returns an error if the credential hasher cannot be initialized.
    pub fn new(store: Arc<dyn AccountStore>) -> anyhow::Result<Self> {
        Ok(Self::with_hasher(store, CredentialHasher::new()?))
    }

    #[must_use]
    pub fn with_hasher(store: Arc<dyn AccountStore>, hasher: CredentialHasher) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
        }
    }

    /// Create an account and its registration metadata.
    ///
    /// # Errors
    /// `Validation` for missing or short input, `DuplicateAccount` when the
    /// email or username is taken, `Internal` for anything else.
    #[instrument(skip(self, input, client), fields(username = %input.username))]
    pub async fn register(
        &self,
        input: Registration,
        client: ClientInfo,
    ) -> Result<CreatedAccount, AuthError> {
        let input = input.validate()?;

        let taken = self
            .store
            .exists_by_email_or_username(&input.email, &input.username)
            .await?;
        if !taken.is_empty() {
            debug!(matches = taken.len(), "email or username already registered");
            return Err(AuthError::DuplicateAccount);
        }

        let password_hash = self.hash_secret(input.password).await?;

        let account = NewAccount {
            full_name: input.full_name,
            email: input.email,
            username: input.username,
            password_hash,
            phone: input.phone,
            address: input.address,
            date_of_birth: input.date_of_birth,
        };

        match self.store.create_account(account, client).await {
            Ok(created) => {
                debug!(account_id = created.id, "account registered");
                Ok(created)
            }
            Err(StoreError::ConstraintViolation(constraint)) => {
                warn!(constraint, "registration lost a uniqueness race");
                Err(AuthError::DuplicateAccount)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Check a secret against the account matching `identifier` as username, then as email.
    ///
    /// # Errors
    /// `Validation` for blank input, `InvalidCredentials` for an unknown
    /// identifier or a wrong secret, `Internal` for anything else.
    #[instrument(skip(self, secret))]
    pub async fn login(
        &self,
        identifier: &str,
        secret: SecretString,
    ) -> Result<AccountProfile, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || secret.expose_secret().is_empty() {
            return Err(AuthError::Validation(MSG_LOGIN_FIELDS_REQUIRED));
        }

        let account = match self.store.find_by_username(identifier).await? {
            Some(account) => Some(account),
            None => self.store.find_by_email(identifier).await?,
        };

        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());
        if !self.verify_secret(secret, stored_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        // verify_secret only succeeds against a real stored hash
        let account = account.ok_or(AuthError::InvalidCredentials)?;

        debug!(account_id = account.id, "login succeeded");

        Ok(AccountProfile {
            id: account.id,
            full_name: account.full_name,
            email: account.email,
            username: account.username,
        })
    }

    /// # Errors
    /// `Internal` if the store fails.
    pub async fn list_users(&self) -> Result<Vec<AccountSummary>, AuthError> {
        Ok(self.store.list_all().await?)
    }

    /// # Errors
    /// `Validation` for a blank term, `Internal` if the store fails.
    #[instrument(skip(self))]
    pub async fn search_users(&self, term: &str) -> Result<Vec<AccountSummary>, AuthError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AuthError::Validation(MSG_SEARCH_REQUIRED));
        }
        Ok(self.store.search(term).await?)
    }

    /// # Errors
    /// `Internal` if the store fails.
    pub async fn stats(&self) -> Result<RegistrationStats, AuthError> {
        Ok(self.store.registration_stats().await?)
    }

    /// # Errors
    /// `Internal` if the store cannot be reached.
    pub async fn health_check(&self) -> Result<(), AuthError> {
        Ok(self.store.ping().await?)
    }

    async fn hash_secret(&self, secret: SecretString) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let hash = tokio::task::spawn_blocking(move || hasher.hash(secret.expose_secret()))
            .await
            .context("credential hashing task failed")??;
        Ok(hash)
    }

    /// Against the dummy hash when `stored_hash` is `None`, which always fails.
    async fn verify_secret(
        &self,
        secret: SecretString,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let verified = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(secret.expose_secret(), &hash),
            None => {
                hasher.verify_dummy(secret.expose_secret());
                Ok(false)
            }
        })
        .await
        .context("credential verification task failed")??;
        Ok(verified)
    }
}
