use async_trait::async_trait;
use chrono::{Days, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    Account, AccountStore, AccountSummary, ClientInfo, CreatedAccount, IdentityMatch, NewAccount,
    RegistrationStats, Result, StoreError,
};

#[derive(Debug, Clone)]
struct Metadata {
    registration_date: chrono::DateTime<Utc>,
    registration_source: String,
    is_verified: bool,
}

#[derive(Debug, Default)]
struct MemoryData {
    accounts: BTreeMap<i32, Account>,
    metadata: BTreeMap<i32, Metadata>,
    next_id: i32,
}

/// In-process store with the same uniqueness and atomicity rules as the
/// PostgreSQL schema. The whole registration happens under one lock.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    data: Mutex<MemoryData>,
    fail_metadata_insert: AtomicBool,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following metadata insert fail, after the account row was staged.
    pub fn fail_metadata_insert(&self, fail: bool) {
        self.fail_metadata_insert.store(fail, Ordering::SeqCst);
    }

    pub async fn account_rows(&self) -> usize {
        self.data.lock().await.accounts.len()
    }

    pub async fn metadata_rows(&self) -> usize {
        self.data.lock().await.metadata.len()
    }

    /// Stored credential for `username`, for assertions on what was persisted.
    pub async fn stored_hash(&self, username: &str) -> Option<String> {
        let data = self.data.lock().await;
        data.accounts
            .values()
            .find(|account| account.username == username)
            .map(|account| account.password_hash.clone())
    }

    /// Flip the verification flag, standing in for the unimplemented verification flow.
    pub async fn mark_verified(&self, account_id: i32) -> bool {
        let mut data = self.data.lock().await;
        match data.metadata.get_mut(&account_id) {
            Some(meta) => {
                meta.is_verified = true;
                true
            }
            None => false,
        }
    }
}

impl MemoryData {
    fn summary(&self, account: &Account) -> AccountSummary {
        let meta = self.metadata.get(&account.id);
        AccountSummary {
            id: account.id,
            full_name: account.full_name.clone(),
            email: account.email.clone(),
            username: account.username.clone(),
            phone: account.phone.clone(),
            address: account.address.clone(),
            date_of_birth: account.date_of_birth,
            created_at: account.created_at,
            updated_at: account.updated_at,
            registration_date: meta.map(|m| m.registration_date),
            is_verified: meta.map(|m| m.is_verified),
            registration_source: meta.map(|m| m.registration_source.clone()),
        }
    }

    /// Newest first, ties broken by id like the SQL ordering.
    fn newest_first<'a>(&self, accounts: impl Iterator<Item = &'a Account>) -> Vec<AccountSummary> {
        let mut rows: Vec<&Account> = accounts.collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.into_iter().map(|account| self.summary(account)).collect()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create_account(
        &self,
        account: NewAccount,
        client: ClientInfo,
    ) -> Result<CreatedAccount> {
        let mut data = self.data.lock().await;

        if data.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::ConstraintViolation("users_email_key".to_string()));
        }
        if data.accounts.values().any(|a| a.username == account.username) {
            return Err(StoreError::ConstraintViolation(
                "users_username_key".to_string(),
            ));
        }

        let id = data.next_id + 1;
        let now = Utc::now();
        let staged = Account {
            id,
            full_name: account.full_name,
            email: account.email,
            username: account.username,
            password_hash: account.password_hash,
            phone: account.phone,
            address: account.address,
            date_of_birth: account.date_of_birth,
            created_at: now,
            updated_at: now,
        };

        // Nothing is written until both records are ready, so a failure here
        // leaves the maps untouched.
        if self.fail_metadata_insert.load(Ordering::SeqCst) {
            debug!(account_id = id, "injected registration_info failure");
            return Err(StoreError::Transaction {
                context: "insert registration_info",
                source: sqlx::Error::Protocol("injected registration_info failure".to_string()),
            });
        }

        let meta = Metadata {
            registration_date: now,
            registration_source: client.source,
            is_verified: false,
        };

        let created = CreatedAccount {
            id,
            full_name: staged.full_name.clone(),
            email: staged.email.clone(),
            username: staged.username.clone(),
            created_at: staged.created_at,
            registration_date: meta.registration_date,
            is_verified: meta.is_verified,
        };

        data.next_id = id;
        data.accounts.insert(id, staged);
        data.metadata.insert(id, meta);

        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn exists_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Vec<IdentityMatch>> {
        let data = self.data.lock().await;
        Ok(data
            .accounts
            .values()
            .filter(|a| a.email == email || a.username == username)
            .map(|a| IdentityMatch {
                id: a.id,
                email: a.email.clone(),
                username: a.username.clone(),
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<AccountSummary>> {
        let data = self.data.lock().await;
        Ok(data.newest_first(data.accounts.values()))
    }

    async fn search(&self, term: &str) -> Result<Vec<AccountSummary>> {
        let needle = term.to_lowercase();
        let data = self.data.lock().await;
        let matches = data.accounts.values().filter(|a| {
            a.full_name.to_lowercase().contains(&needle)
                || a.email.to_lowercase().contains(&needle)
                || a.username.to_lowercase().contains(&needle)
        });
        Ok(data.newest_first(matches))
    }

    async fn registration_stats(&self) -> Result<RegistrationStats> {
        let data = self.data.lock().await;
        let today = Utc::now().date_naive();
        let since = |days: u64| {
            today
                .checked_sub_days(Days::new(days))
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
        };
        let (week, month) = (since(7), since(30));

        let mut stats = RegistrationStats::default();
        for account in data.accounts.values() {
            stats.total_users += 1;
            match data.metadata.get(&account.id).map(|meta| meta.is_verified) {
                Some(true) => stats.verified_users += 1,
                Some(false) => stats.unverified_users += 1,
                None => {}
            }
            if week.is_some_and(|start| account.created_at >= start) {
                stats.users_last_7_days += 1;
            }
            if month.is_some_and(|start| account.created_at >= start) {
                stats.users_last_30_days += 1;
            }
        }

        Ok(stats)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_account(email: &str, username: &str) -> NewAccount {
        NewAccount {
            full_name: "Ann Lee".to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$test".to_string(),
            phone: None,
            address: None,
            date_of_birth: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = MemoryAccountStore::new();
        let first = store
            .create_account(new_account("a@x.com", "a"), ClientInfo::default())
            .await
            .unwrap();
        let second = store
            .create_account(new_account("b@x.com", "b"), ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(!first.is_verified);
    }

    #[tokio::test]
    async fn duplicate_email_or_username_is_a_constraint_violation() {
        let store = MemoryAccountStore::new();
        store
            .create_account(new_account("a@x.com", "a"), ClientInfo::default())
            .await
            .unwrap();

        let by_email = store
            .create_account(new_account("a@x.com", "other"), ClientInfo::default())
            .await;
        assert!(matches!(by_email, Err(StoreError::ConstraintViolation(c)) if c == "users_email_key"));

        let by_username = store
            .create_account(new_account("other@x.com", "a"), ClientInfo::default())
            .await;
        assert!(matches!(by_username, Err(StoreError::ConstraintViolation(_))));
        assert_eq!(store.account_rows().await, 1);
    }

    #[tokio::test]
    async fn injected_metadata_failure_leaves_no_rows() {
        let store = MemoryAccountStore::new();
        store.fail_metadata_insert(true);

        let result = store
            .create_account(new_account("a@x.com", "a"), ClientInfo::default())
            .await;

        assert!(matches!(result, Err(StoreError::Transaction { .. })));
        assert_eq!(store.account_rows().await, 0);
        assert_eq!(store.metadata_rows().await, 0);
        assert!(store.find_by_username("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = MemoryAccountStore::new();
        store
            .create_account(new_account("ann@x.com", "annl"), ClientInfo::default())
            .await
            .unwrap();
        store
            .create_account(new_account("bob@y.com", "bob"), ClientInfo::default())
            .await
            .unwrap();

        let found = store.search("ANN").await.unwrap();
        assert_eq!(found.len(), 2, "full name 'Ann Lee' matches both rows");

        let found = store.search("Y.CO").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "bob");
    }

    #[tokio::test]
    async fn list_is_newest_first_and_stats_count_verification() {
        let store = MemoryAccountStore::new();
        for (email, username) in [("a@x.com", "a"), ("b@x.com", "b"), ("c@x.com", "c")] {
            store
                .create_account(new_account(email, username), ClientInfo::default())
                .await
                .unwrap();
        }
        assert!(store.mark_verified(2).await);

        let listed = store.list_all().await.unwrap();
        let ids: Vec<i32> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(listed[0].registration_source.as_deref(), Some("web"));

        let stats = store.registration_stats().await.unwrap();
        assert_eq!(
            stats,
            RegistrationStats {
                total_users: 3,
                verified_users: 1,
                unverified_users: 2,
                users_last_7_days: 3,
                users_last_30_days: 3,
            }
        );
    }
}
