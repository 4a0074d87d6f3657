//! CRUD over the `post` table, joined with each post's author.

use chrono::{DateTime, Utc};
use cubicle_core::{Post, PostForm, PostId, UserId};

use crate::db::Database;
use crate::StoreError;

const SELECT_POSTS: &str = "SELECT p.id, title, body, created, author_id, username \
     FROM post p JOIN user u ON p.author_id = u.id \
     ORDER BY created DESC, p.id DESC";

const SELECT_POST: &str = "SELECT p.id, title, body, created, author_id, username \
     FROM post p JOIN user u ON p.author_id = u.id \
     WHERE p.id = ?";

const INSERT_POST: &str =
    "INSERT INTO post (title, body, author_id, created) VALUES (?, ?, ?, ?)";

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    body: String,
    created: DateTime<Utc>,
    author_id: i64,
    username: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post::new(
            PostId::new(row.id),
            row.title,
            row.body,
            UserId::new(row.author_id),
            row.username,
            row.created,
        )
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CountRow {
    n: i64,
}

/// A post whose authorship has been checked against the acting user.
///
/// Only [`PostRepository::authorize`] can produce one, so holding an
/// `OwnedPost` is proof that the existence and ownership checks ran.
#[derive(Debug, Clone)]
pub struct OwnedPost(Post);

impl OwnedPost {
    /// The checked post.
    #[must_use]
    pub fn post(&self) -> &Post {
        &self.0
    }

    /// Unwrap into the plain post.
    #[must_use]
    pub fn into_inner(self) -> Post {
        self.0
    }
}

/// Repository for blog posts.
#[derive(Debug, Clone)]
pub struct PostRepository {
    db: Database,
}

impl PostRepository {
    /// Create a repository over `db`.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All posts with their author's username, newest first.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] on query failure.
    pub async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let mut conn = self.db.connect().await?;
        let rows = conn.fetch_all(sqlx::query_as::<_, PostRow>(SELECT_POSTS)).await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Fetch a post by id, optionally requiring a specific author.
    ///
    /// Existence is checked before authorship, so a caller can never learn
    /// who owns a post that does not exist.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no post has this id, then
    /// [`StoreError::Forbidden`] if `require_author` is set and differs from
    /// the post's author.
    pub async fn get_post(
        &self,
        id: PostId,
        require_author: Option<UserId>,
    ) -> Result<Post, StoreError> {
        let mut conn = self.db.connect().await?;
        let row = conn
            .fetch_optional(sqlx::query_as::<_, PostRow>(SELECT_POST).bind(id.get()))
            .await?;
        let post = row.map(Post::from).ok_or(StoreError::NotFound(id))?;

        if let Some(user) = require_author {
            if !post.is_authored_by(user) {
                tracing::warn!(post_id = %id, user_id = %user, "post access denied");
                return Err(StoreError::Forbidden { post: id, user });
            }
        }
        Ok(post)
    }

    /// Fetch a post that `author` is allowed to modify.
    ///
    /// # Errors
    /// Same as [`get_post`](Self::get_post) with `require_author` set.
    pub async fn authorize(&self, id: PostId, author: UserId) -> Result<OwnedPost, StoreError> {
        self.get_post(id, Some(author)).await.map(OwnedPost)
    }

    /// Insert a new post by `author_id` and return its id.
    ///
    /// # Errors
    /// Returns [`StoreError::Validation`] without touching the database if
    /// the title is blank, or [`StoreError::Database`] if the insert fails.
    pub async fn create_post(
        &self,
        form: &PostForm,
        author_id: UserId,
    ) -> Result<PostId, StoreError> {
        form.validate()?;

        let mut conn = self.db.connect().await?;
        let id = conn
            .insert(
                sqlx::query(INSERT_POST)
                    .bind(&form.title)
                    .bind(&form.body)
                    .bind(author_id.get())
                    .bind(Utc::now()),
            )
            .await?;
        conn.commit().await?;

        let id = PostId::new(id);
        tracing::info!(post_id = %id, author_id = %author_id, "post created");
        Ok(id)
    }

    /// Replace the title and body of a post the caller owns.
    ///
    /// Author and creation time are left untouched.
    ///
    /// # Errors
    /// Returns [`StoreError::Validation`] if the title is blank, or
    /// [`StoreError::NotFound`] if the post was deleted after it was
    /// authorized.
    pub async fn update_post(&self, owned: &OwnedPost, form: &PostForm) -> Result<(), StoreError> {
        form.validate()?;

        let id = owned.post().id;
        let mut conn = self.db.connect().await?;
        let affected = conn
            .execute(
                sqlx::query("UPDATE post SET title = ?, body = ? WHERE id = ?")
                    .bind(&form.title)
                    .bind(&form.body)
                    .bind(id.get()),
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        conn.commit().await?;

        tracing::info!(post_id = %id, "post updated");
        Ok(())
    }

    /// Delete a post the caller owns.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] if the delete fails.
    pub async fn delete_post(&self, owned: OwnedPost) -> Result<(), StoreError> {
        let id = owned.post().id;
        let mut conn = self.db.connect().await?;
        conn.execute(sqlx::query("DELETE FROM post WHERE id = ?").bind(id.get())).await?;
        conn.commit().await?;

        tracing::info!(post_id = %id, "post deleted");
        Ok(())
    }

    /// Number of stored posts.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] on query failure.
    pub async fn count_posts(&self) -> Result<u64, StoreError> {
        let mut conn = self.db.connect().await?;
        let row = conn
            .fetch_optional(sqlx::query_as::<_, CountRow>("SELECT COUNT(*) AS n FROM post"))
            .await?;
        Ok(row.map_or(0, |r| u64::try_from(r.n).unwrap_or(0)))
    }
}
