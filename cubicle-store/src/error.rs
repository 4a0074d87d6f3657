//! Error types for the store crate.

use cubicle_core::{CoreError, PostId, UserId};

/// Errors that can occur while reading or writing the relational store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No post row has the requested id.
    #[error("Post id {0} doesn't exist.")]
    NotFound(PostId),

    /// The post exists but belongs to someone else.
    ///
    /// The message names neither id; the ids are logged where this is raised.
    #[error("You are not allowed to modify this post.")]
    Forbidden { post: PostId, user: UserId },

    /// Submitted values failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// Registration with a username that is already taken.
    #[error("User {0} is already registered.")]
    DuplicateUser(String),

    /// A password could not be hashed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// Underlying database error.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
