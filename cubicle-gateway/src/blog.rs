//! Blog handlers: list, show, create, update, delete.
//!
//! Writes require a [`CurrentUser`]; update and delete also require that the
//! user wrote the post.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use cubicle_core::{PostForm, PostId};
use cubicle_store::StoreError;
use tower_sessions::Session;

use crate::{error::GatewayError, session::CurrentUser, state::AppState, views};

fn rejected(page: Result<Html<String>, GatewayError>) -> Result<Response, GatewayError> {
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page?).into_response())
}

/// `GET /`
///
/// # Errors
/// Returns [`GatewayError::Store`] if the posts cannot be read.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, GatewayError> {
    let user = CurrentUser::from_session(&session).await?;
    let posts = state.posts.list_posts().await?;
    views::index(&posts, user.as_ref())
}

/// `GET /{id}`
///
/// # Errors
/// Returns [`GatewayError::Store`] with `NotFound` for an unknown id.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Html<String>, GatewayError> {
    let user = CurrentUser::from_session(&session).await?;
    let post = state.posts.get_post(PostId::new(id), None).await?;
    views::show(&post, user.as_ref())
}

/// `GET /create`
///
/// # Errors
/// Returns [`GatewayError::Render`] if the page fails to render.
pub async fn create_form(user: CurrentUser) -> Result<Html<String>, GatewayError> {
    views::create_form(&PostForm::default(), None, &user)
}

/// `POST /create`
///
/// # Errors
/// Returns [`GatewayError::Store`] if the insert fails. A blank title is not
/// an error: the form comes back with status 422.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<PostForm>,
) -> Result<Response, GatewayError> {
    match state.posts.create_post(&form, user.id).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(StoreError::Validation(e)) => {
            rejected(views::create_form(&form, Some(&e.to_string()), &user))
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /{id}/update`
///
/// # Errors
/// Returns `NotFound` or `Forbidden` from
/// [`PostRepository::authorize`](cubicle_store::PostRepository::authorize).
pub async fn update_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, GatewayError> {
    let owned = state.posts.authorize(PostId::new(id), user.id).await?;
    let post = owned.post();
    views::update_form(post.id, &PostForm::from_post(post), None, &user)
}

/// `POST /{id}/update`
///
/// # Errors
/// Same as [`update_form`], plus store failures during the write.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Response, GatewayError> {
    let owned = state.posts.authorize(PostId::new(id), user.id).await?;
    match state.posts.update_post(&owned, &form).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(StoreError::Validation(e)) => rejected(views::update_form(
            owned.post().id,
            &form,
            Some(&e.to_string()),
            &user,
        )),
        Err(e) => Err(e.into()),
    }
}

/// `POST /{id}/delete`
///
/// # Errors
/// Same as [`update_form`], plus store failures during the delete.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, GatewayError> {
    let owned = state.posts.authorize(PostId::new(id), user.id).await?;
    state.posts.delete_post(owned).await?;
    Ok(Redirect::to("/"))
}
