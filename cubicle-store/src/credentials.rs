//! Credential lookup and password hashing.
//!
//! Authentication goes through the [`CredentialStore`] trait so the HTTP
//! layer never compares passwords itself. [`SqlCredentialStore`] keeps
//! argon2 PHC hashes in the `user` table.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use cubicle_core::{Credentials, User, UserId};

use crate::db::Database;
use crate::StoreError;

/// A user row including its password hash.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

/// Source of truth for who may log in.
///
/// Implementations must be `Send + Sync` to be shared across handlers.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by its exact username.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] if the lookup fails.
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, StoreError>;

    /// Register a new account.
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateUser`] if the username is taken,
    /// [`StoreError::PasswordHash`] if hashing fails, or
    /// [`StoreError::Database`] on other failures.
    async fn create_user(&self, username: &str, password: &str) -> Result<User, StoreError>;

    /// Check a username/password pair.
    ///
    /// Returns `Ok(None)` for an unknown user and for a wrong password alike.
    /// An unknown user is checked against [`UNKNOWN_USER_HASH`] so both
    /// cases cost one argon2 verification.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] if the lookup fails, or
    /// [`StoreError::PasswordHash`] if the hashing task dies.
    async fn verify(&self, credentials: &Credentials) -> Result<Option<User>, StoreError> {
        let (user, hash) = match self.find_by_username(&credentials.username).await? {
            Some(stored) => (Some(stored.user), stored.password_hash),
            None => (None, UNKNOWN_USER_HASH.to_owned()),
        };
        let password = credentials.password.clone();
        let matches = off_runtime(move || verify_password(&password, &hash)).await?;
        Ok(user.filter(|_| matches))
    }
}

/// Well-formed argon2id hash with default parameters that no password matches
/// in practice. Verified against when a username is unknown.
pub const UNKNOWN_USER_HASH: &str = concat!(
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$",
    "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
);

/// Run argon2 work on the blocking pool so it never stalls a runtime worker.
async fn off_runtime<T, F>(work: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::PasswordHash(format!("hashing task failed: {e}")))
}

/// Hash `password` with argon2id and a fresh random salt.
///
/// # Errors
/// Returns [`StoreError::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))
}

/// Check `password` against a stored PHC hash string.
///
/// A malformed stored hash never verifies.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
}

/// [`CredentialStore`] backed by the `user` table.
#[derive(Debug, Clone)]
pub struct SqlCredentialStore {
    db: Database,
}

impl SqlCredentialStore {
    /// Create a store over `db`.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create the account unless a user with this name already exists.
    ///
    /// An existing account keeps its current password.
    ///
    /// # Errors
    /// Same as [`CredentialStore::create_user`], except that a taken
    /// username is not an error.
    pub async fn ensure_user(&self, username: &str, password: &str) -> Result<User, StoreError> {
        if let Some(existing) = self.find_by_username(username).await? {
            return Ok(existing.user);
        }
        match self.create_user(username, password).await {
            // Lost a race with another seeder; the row is there now.
            Err(StoreError::DuplicateUser(_)) => self
                .find_by_username(username)
                .await?
                .map(|stored| stored.user)
                .ok_or_else(|| StoreError::DuplicateUser(username.to_owned())),
            other => other,
        }
    }
}

#[async_trait]
impl CredentialStore for SqlCredentialStore {
    async fn create_user(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let password = password.to_owned();
        let password_hash = off_runtime(move || hash_password(&password)).await??;

        let mut conn = self.db.connect().await?;
        let inserted = conn
            .insert(
                sqlx::query("INSERT INTO user (username, password_hash) VALUES (?, ?)")
                    .bind(username)
                    .bind(&password_hash),
            )
            .await;
        let id = match inserted {
            Ok(id) => id,
            Err(StoreError::Database(e))
                if e.as_database_error().is_some_and(|db| db.is_unique_violation()) =>
            {
                return Err(StoreError::DuplicateUser(username.to_owned()));
            }
            Err(e) => return Err(e),
        };
        conn.commit().await?;

        let user = User::new(UserId::new(id), username);
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, StoreError> {
        let mut conn = self.db.connect().await?;
        let row = conn
            .fetch_optional(
                sqlx::query_as::<_, UserRow>(
                    "SELECT id, username, password_hash FROM user WHERE username = ?",
                )
                .bind(username),
            )
            .await?;
        Ok(row.map(|row| StoredUser {
            user: User::new(UserId::new(row.id), row.username),
            password_hash: row.password_hash,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    async fn store() -> SqlCredentialStore {
        match Database::in_memory().await {
            Ok(db) => SqlCredentialStore::new(db),
            Err(e) => panic!("in-memory database failed: {e}"),
        }
    }

    #[test]
    fn hash_password_produces_argon2_phc_string() {
        let hash = hash_password("MySecurePassword123!").expect("hash");
        assert_ne!(hash, "MySecurePassword123!");
        assert!(hash.starts_with("$argon2"), "expected PHC string, got {hash}");
    }

    #[test]
    fn verify_password_accepts_only_the_original() {
        let hash = hash_password("MySecret").expect("hash");
        assert!(verify_password("MySecret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn verify_password_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn seeded_account_logs_in_and_others_do_not() {
        let store = store().await;
        store.ensure_user("5icoding@sina.cn", "888888").await.expect("seed");

        let ok = store
            .verify(&Credentials::new("5icoding@sina.cn", "888888"))
            .await
            .expect("verify");
        assert_eq!(ok.map(|u| u.username), Some("5icoding@sina.cn".to_owned()));

        for (user, pw) in [("5icoding@sina.cn", "888887"), ("someone@else", "888888"), ("", "")] {
            let result = store.verify(&Credentials::new(user, pw)).await.expect("verify");
            assert!(result.is_none(), "({user}, {pw}) must not authenticate");
        }
    }

    #[test]
    fn unknown_user_hash_costs_as_much_as_a_real_one() {
        let dummy = match PasswordHash::new(UNKNOWN_USER_HASH) {
            Ok(h) => h,
            Err(e) => panic!("dummy hash must parse: {e}"),
        };
        let real_hash = hash_password("anything").expect("hash");
        let real = PasswordHash::new(&real_hash).expect("parse");
        assert_eq!(dummy.algorithm, real.algorithm);
        assert_eq!(dummy.params, real.params, "dummy must use the default cost");
        assert!(!verify_password("anything", UNKNOWN_USER_HASH));
    }

    #[tokio::test]
    async fn unknown_and_known_users_take_comparable_time() {
        let store = store().await;
        store.ensure_user("erin", "right").await.expect("seed");

        let mut known = Duration::MAX;
        let mut unknown = Duration::MAX;
        for _ in 0..3 {
            let started = Instant::now();
            let hit = store.verify(&Credentials::new("erin", "wrong")).await.expect("verify");
            known = known.min(started.elapsed());
            assert!(hit.is_none());

            let started = Instant::now();
            let miss = store.verify(&Credentials::new("nobody", "wrong")).await.expect("verify");
            unknown = unknown.min(started.elapsed());
            assert!(miss.is_none());
        }
        assert!(
            unknown * 4 >= known,
            "unknown user answered in {unknown:?}, known user in {known:?}"
        );
    }

    #[tokio::test]
    async fn duplicate_username_is_reported() {
        let store = store().await;
        store.create_user("carol", "one").await.expect("first");
        let result = store.create_user("carol", "two").await;
        assert!(
            matches!(result, Err(StoreError::DuplicateUser(ref name)) if name == "carol"),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn ensure_user_keeps_existing_password() {
        let store = store().await;
        let first = store.ensure_user("dave", "original").await.expect("seed");
        let second = store.ensure_user("dave", "changed").await.expect("reseed");
        assert_eq!(first.id, second.id);

        let ok = store.verify(&Credentials::new("dave", "original")).await.expect("verify");
        assert!(ok.is_some(), "original password must still work");
    }
}
