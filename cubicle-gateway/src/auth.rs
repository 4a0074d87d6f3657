//! Login, logout, registration and the admin landing page.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use cubicle_core::Credentials;
use cubicle_store::{CredentialStore, StoreError};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    error::GatewayError,
    session::{self, CurrentUser, LOGIN_PATH},
    state::AppState,
    views,
};

/// Landing page after a successful login.
pub const ADMIN_PATH: &str = "/admin";

/// Fields posted by the login form.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub pwd: String,
}

/// Fields posted by the registration form.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// `GET /login`
///
/// # Errors
/// Returns [`GatewayError::Render`] if the page fails to render.
pub async fn login_page() -> Result<Html<String>, GatewayError> {
    views::login_page()
}

/// `POST /login`
///
/// Wrong credentials redirect back to the login page without saying which
/// field was wrong.
///
/// # Errors
/// Returns [`GatewayError::Store`] if the account lookup fails, or
/// [`GatewayError::Session`] if the session cannot be written.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, GatewayError> {
    let credentials = Credentials::new(form.email, form.pwd);
    if credentials.validate().is_err() {
        tracing::warn!("login rejected: empty field");
        return Ok(Redirect::to(LOGIN_PATH));
    }

    match state.credentials.verify(&credentials).await? {
        Some(user) => {
            let user = CurrentUser::from(user);
            tracing::info!(user_id = %user.id, "login succeeded");
            session::establish(&session, user).await?;
            Ok(Redirect::to(ADMIN_PATH))
        }
        None => {
            tracing::warn!("login rejected");
            Ok(Redirect::to(LOGIN_PATH))
        }
    }
}

/// `GET /logout`
///
/// # Errors
/// Returns [`GatewayError::Session`] if the session cannot be cleared.
pub async fn logout(session: Session) -> Result<Redirect, GatewayError> {
    session::end(&session).await?;
    Ok(Redirect::to("/"))
}

/// `GET /admin`
pub async fn admin(user: CurrentUser) -> &'static str {
    tracing::debug!(user_id = %user.id, "admin page");
    "admin"
}

/// `GET /register`
///
/// # Errors
/// Returns [`GatewayError::Render`] if the page fails to render.
pub async fn register_page() -> Result<Html<String>, GatewayError> {
    views::register_page("", None)
}

/// `POST /register`
///
/// Missing fields and taken usernames re-render the form with status 422.
///
/// # Errors
/// Returns [`GatewayError::Store`] for failures other than a taken username.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, GatewayError> {
    let credentials = Credentials::new(form.username.trim(), form.password);
    let retry = |message: String| -> Result<Response, GatewayError> {
        let page = views::register_page(&credentials.username, Some(&message))?;
        Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
    };

    if let Err(e) = credentials.validate() {
        return retry(e.to_string());
    }
    match state
        .credentials
        .create_user(&credentials.username, &credentials.password)
        .await
    {
        Ok(_) => Ok(Redirect::to(LOGIN_PATH).into_response()),
        Err(e @ StoreError::DuplicateUser(_)) => retry(e.to_string()),
        Err(e) => Err(e.into()),
    }
}
