use async_trait::async_trait;
use sqlx::{Connection, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::{Instrument, debug, info_span, instrument, warn};

use super::{
    Account, AccountStore, AccountSummary, ClientInfo, CreatedAccount, IdentityMatch, NewAccount,
    RegistrationStats, Result, StoreError, escape_like, is_unique_violation,
};

const FIND_BY_EMAIL: &str = r"
    SELECT id, full_name, email, username, password, phone, address,
           date_of_birth, created_at, updated_at
    FROM users
    WHERE email = $1
";

const FIND_BY_USERNAME: &str = r"
    SELECT id, full_name, email, username, password, phone, address,
           date_of_birth, created_at, updated_at
    FROM users
    WHERE username = $1
";

const SUMMARY_SELECT: &str = r"
    SELECT
        u.id, u.full_name, u.email, u.username, u.phone, u.address,
        u.date_of_birth, u.created_at, u.updated_at,
        ri.registration_date, ri.is_verified, ri.registration_source
    FROM users u
    LEFT JOIN registration_info ri ON u.id = ri.user_id
";

/// PostgreSQL-backed account store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_account(&self, query: &'static str, value: &str) -> Result<Option<Account>> {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(value)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.map(|row| account_from_row(&row)).transpose()
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self, account, client), fields(username = %account.username))]
    async fn create_account(
        &self,
        account: NewAccount,
        client: ClientInfo,
    ) -> Result<CreatedAccount> {
        let mut tx = self.pool.begin().await.map_err(|source| StoreError::Transaction {
            context: "begin registration",
            source,
        })?;

        let query = r"
            INSERT INTO users
                (full_name, email, username, password, phone, address, date_of_birth)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, full_name, email, username, created_at
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let inserted = sqlx::query(query)
            .bind(&account.full_name)
            .bind(&account.email)
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(account.phone.as_deref())
            .bind(account.address.as_deref())
            .bind(account.date_of_birth)
            .fetch_one(&mut *tx)
            .instrument(span)
            .await;

        let user_row = match inserted {
            Ok(row) => row,
            Err(err) => return Err(abort(tx, "insert users", err).await),
        };
        let user_id: i32 = match user_row.try_get("id") {
            Ok(id) => id,
            Err(err) => return Err(abort(tx, "read users id", err).await),
        };

        let query = r"
            INSERT INTO registration_info
                (user_id, registration_source, ip_address, user_agent)
            VALUES ($1, $2, $3::inet, $4)
            RETURNING registration_date, is_verified
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let inserted = sqlx::query(query)
            .bind(user_id)
            .bind(&client.source)
            .bind(client.ip_address.as_deref())
            .bind(client.user_agent.as_deref())
            .fetch_one(&mut *tx)
            .instrument(span)
            .await;

        let info_row = match inserted {
            Ok(row) => row,
            Err(err) => return Err(abort(tx, "insert registration_info", err).await),
        };

        let created = match created_from_rows(&user_row, &info_row) {
            Ok(created) => created,
            Err(err) => return Err(abort(tx, "read registration rows", err).await),
        };

        tx.commit()
            .await
            .map_err(|source| StoreError::Transaction {
                context: "commit registration",
                source,
            })?;

        debug!(account_id = created.id, "registration committed");

        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.find_account(FIND_BY_EMAIL, email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.find_account(FIND_BY_USERNAME, username).await
    }

    async fn exists_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Vec<IdentityMatch>> {
        let query = "SELECT id, email, username FROM users WHERE email = $1 OR username = $2";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(email)
            .bind(username)
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;

        rows.iter()
            .map(|row| -> Result<IdentityMatch> {
                Ok(IdentityMatch {
                    id: row.try_get("id")?,
                    email: row.try_get("email")?,
                    username: row.try_get("username")?,
                })
            })
            .collect()
    }

    async fn list_all(&self) -> Result<Vec<AccountSummary>> {
        let query = format!("{SUMMARY_SELECT} ORDER BY u.created_at DESC, u.id DESC");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn search(&self, term: &str) -> Result<Vec<AccountSummary>> {
        let query = format!(
            r"{SUMMARY_SELECT}
            WHERE u.full_name ILIKE $1 ESCAPE '\'
               OR u.email ILIKE $1 ESCAPE '\'
               OR u.username ILIKE $1 ESCAPE '\'
            ORDER BY u.created_at DESC, u.id DESC"
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let rows = sqlx::query(&query)
            .bind(format!("%{}%", escape_like(term)))
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn registration_stats(&self) -> Result<RegistrationStats> {
        let query = r"
            SELECT
                COUNT(*) AS total_users,
                COUNT(*) FILTER (WHERE ri.is_verified = TRUE) AS verified_users,
                COUNT(*) FILTER (WHERE ri.is_verified = FALSE) AS unverified_users,
                COUNT(*) FILTER (WHERE u.created_at >= CURRENT_DATE - INTERVAL '7 days') AS users_last_7_days,
                COUNT(*) FILTER (WHERE u.created_at >= CURRENT_DATE - INTERVAL '30 days') AS users_last_30_days
            FROM users u
            LEFT JOIN registration_info ri ON u.id = ri.user_id
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;

        Ok(RegistrationStats {
            total_users: row.try_get("total_users")?,
            verified_users: row.try_get("verified_users")?,
            unverified_users: row.try_get("unverified_users")?,
            users_last_7_days: row.try_get("users_last_7_days")?,
            users_last_30_days: row.try_get("users_last_30_days")?,
        })
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

/// Roll back and classify the failure. Unique violations become `ConstraintViolation`.
async fn abort(
    tx: Transaction<'_, Postgres>,
    context: &'static str,
    err: sqlx::Error,
) -> StoreError {
    if let Err(rollback_err) = tx.rollback().await {
        warn!(error = %rollback_err, context, "rollback failed; connection will be discarded");
    }

    if is_unique_violation(&err) {
        let constraint = match &err {
            sqlx::Error::Database(db_err) => db_err.constraint().unwrap_or("unique").to_string(),
            _ => "unique".to_string(),
        };
        return StoreError::ConstraintViolation(constraint);
    }

    StoreError::Transaction {
        context,
        source: err,
    }
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        date_of_birth: row.try_get("date_of_birth")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn summary_from_row(row: &PgRow) -> Result<AccountSummary> {
    Ok(AccountSummary {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        date_of_birth: row.try_get("date_of_birth")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        registration_date: row.try_get("registration_date")?,
        is_verified: row.try_get("is_verified")?,
        registration_source: row.try_get("registration_source")?,
    })
}

fn created_from_rows(
    user_row: &PgRow,
    info_row: &PgRow,
) -> std::result::Result<CreatedAccount, sqlx::Error> {
    Ok(CreatedAccount {
        id: user_row.try_get("id")?,
        full_name: user_row.try_get("full_name")?,
        email: user_row.try_get("email")?,
        username: user_row.try_get("username")?,
        created_at: user_row.try_get("created_at")?,
        registration_date: info_row.try_get("registration_date")?,
        is_verified: info_row.try_get("is_verified")?,
    })
}
