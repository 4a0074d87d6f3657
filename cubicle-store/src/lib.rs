//! SQLite persistence for the Cubicle blog.
//!
//! Provides request-scoped transactional connections ([`Database`],
//! [`Connection`]), the post repository, and the credential store used by
//! the login gate.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod credentials;
pub mod db;
pub mod error;
pub mod posts;
pub mod schema;

pub use credentials::{
    hash_password, verify_password, CredentialStore, SqlCredentialStore, StoredUser,
    UNKNOWN_USER_HASH,
};
pub use db::{Connection, Database};
pub use error::StoreError;
pub use posts::{OwnedPost, PostRepository};
