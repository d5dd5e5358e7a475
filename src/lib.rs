//! # Roster (user registration and login)
//!
//! `roster` is a small authentication service: a JSON API to register an
//! account and to log in with it, backed by PostgreSQL.
//!
//! ## Accounts
//!
//! An account lives in `users`; each account has exactly one companion row in
//! `registration_info` recording where and how it registered. Both rows are
//! written in a single transaction, so a failed registration leaves nothing
//! behind.
//!
//! - **Uniqueness:** email and username are unique. The service checks both
//!   before inserting, but the database constraints are what actually decide.
//! - **Credentials:** secrets are stored as salted Argon2id hashes and are
//!   never returned by any endpoint.
//! - **Login:** accepts a username or an email. An unknown identifier and a
//!   wrong secret produce the same `401` response.
//!
//! ## Admin endpoints
//!
//! `/api/users`, `/api/users/search` and `/api/stats` expose account listings.
//! They require `Authorization: Bearer <token>` when an admin token is configured.

pub mod accounts;
pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
