use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::{PostId, UserId};

/// A blog entry joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Post {
    /// Row id.
    pub id: PostId,
    /// Non-blank title.
    pub title: String,
    /// Free-form body, empty when none was given.
    pub body: String,
    /// The single user allowed to modify this post.
    pub author_id: UserId,
    /// Username of the author, from the `user` join.
    pub author_username: String,
    /// Assigned by the server when the row is inserted.
    pub created: DateTime<Utc>,
}

impl Post {
    /// Assemble a post from its stored columns.
    #[must_use]
    pub fn new(
        id: PostId,
        title: String,
        body: String,
        author_id: UserId,
        author_username: String,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            body,
            author_id,
            author_username,
            created,
        }
    }

    /// Returns `true` if `user` wrote this post.
    #[must_use]
    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author_id == user
    }
}

/// Title and body as submitted through the create or update form.
///
/// Missing fields deserialize to empty strings so an absent title is reported
/// the same way as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl PostForm {
    /// Create a form from a title and body.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Pre-fill a form with the stored values of `post`.
    #[must_use]
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            body: post.body.clone(),
        }
    }

    /// Check the form before anything is written.
    ///
    /// Whitespace-only titles are rejected along with empty ones.
    ///
    /// # Errors
    /// Returns [`CoreError::TitleRequired`] if the title is blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::TitleRequired);
        }
        Ok(())
    }
}
