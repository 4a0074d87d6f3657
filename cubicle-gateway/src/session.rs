//! The logged-in user, as carried by the session cookie.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use cubicle_core::{User, UserId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::GatewayError;

/// Session key holding the [`CurrentUser`].
pub const SESSION_USER_KEY: &str = "user";

/// Where anonymous visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// The authenticated user of a request.
///
/// As an extractor it gates a handler: anonymous requests are redirected to
/// [`LOGIN_PATH`] before the handler body runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

impl CurrentUser {
    /// The user stored in `session`, if any.
    ///
    /// # Errors
    /// Returns [`GatewayError::Session`] if the session cannot be loaded.
    pub async fn from_session(session: &Session) -> Result<Option<Self>, GatewayError> {
        Ok(session.get::<Self>(SESSION_USER_KEY).await?)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        match Self::from_session(&session).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(Redirect::to(LOGIN_PATH).into_response()),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable session treated as anonymous");
                Err(Redirect::to(LOGIN_PATH).into_response())
            }
        }
    }
}

/// Log `user` in: issue a fresh session id, then remember the user.
///
/// # Errors
/// Returns [`GatewayError::Session`] if the session store fails.
pub async fn establish(session: &Session, user: CurrentUser) -> Result<(), GatewayError> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, user).await?;
    Ok(())
}

/// Log out: drop everything in the session.
///
/// # Errors
/// Returns [`GatewayError::Session`] if the session store fails.
pub async fn end(session: &Session) -> Result<(), GatewayError> {
    session.flush().await?;
    Ok(())
}
