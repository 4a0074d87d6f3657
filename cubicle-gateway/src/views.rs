//! HTML pages for the blog and the login gate.
//!
//! Pages are askama templates under `templates/`. Every `.html` template
//! escapes interpolated values, so user text never reaches the page raw.

use askama::Template;
use axum::response::Html;
use cubicle_core::{Post, PostForm, PostId};

use crate::{error::GatewayError, session::CurrentUser};

/// A post as the listing and detail pages show it.
struct PostCard<'a> {
    id: PostId,
    title: &'a str,
    author: &'a str,
    created: String,
    body: &'a str,
    /// Whether the viewer may edit it.
    editable: bool,
}

impl<'a> PostCard<'a> {
    fn new(post: &'a Post, viewer: Option<&CurrentUser>) -> Self {
        Self {
            id: post.id,
            title: &post.title,
            author: &post.author_username,
            created: post.created.format("%Y-%m-%d").to_string(),
            body: &post.body,
            editable: viewer.is_some_and(|user| post.is_authored_by(user.id)),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    user: Option<&'a CurrentUser>,
    cards: Vec<PostCard<'a>>,
}

#[derive(Template)]
#[template(path = "show.html")]
struct ShowPage<'a> {
    user: Option<&'a CurrentUser>,
    card: PostCard<'a>,
}

#[derive(Template)]
#[template(path = "create.html")]
struct CreatePage<'a> {
    user: Option<&'a CurrentUser>,
    form: &'a PostForm,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "update.html")]
struct UpdatePage<'a> {
    user: Option<&'a CurrentUser>,
    id: PostId,
    form: &'a PostForm,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage {
    user: Option<CurrentUser>,
}

#[derive(Template)]
#[template(path = "register.html")]
struct RegisterPage<'a> {
    user: Option<CurrentUser>,
    username: &'a str,
    error: Option<&'a str>,
}

fn html(page: &impl Template) -> Result<Html<String>, GatewayError> {
    Ok(Html(page.render()?))
}

/// `GET /`: every post, newest first.
///
/// # Errors
/// Returns [`GatewayError::Render`] if the template fails to render.
pub fn index(posts: &[Post], user: Option<&CurrentUser>) -> Result<Html<String>, GatewayError> {
    let cards = posts.iter().map(|post| PostCard::new(post, user)).collect();
    html(&IndexPage { user, cards })
}

/// `GET /{id}`
///
/// # Errors
/// Returns [`GatewayError::Render`] if the template fails to render.
pub fn show(post: &Post, user: Option<&CurrentUser>) -> Result<Html<String>, GatewayError> {
    html(&ShowPage {
        user,
        card: PostCard::new(post, user),
    })
}

/// `GET /create`, and the same page with `error` after a rejected submit.
///
/// # Errors
/// Returns [`GatewayError::Render`] if the template fails to render.
pub fn create_form(
    form: &PostForm,
    error: Option<&str>,
    user: &CurrentUser,
) -> Result<Html<String>, GatewayError> {
    html(&CreatePage {
        user: Some(user),
        form,
        error,
    })
}

/// `GET /{id}/update`, with a delete button.
///
/// # Errors
/// Returns [`GatewayError::Render`] if the template fails to render.
pub fn update_form(
    id: PostId,
    form: &PostForm,
    error: Option<&str>,
    user: &CurrentUser,
) -> Result<Html<String>, GatewayError> {
    html(&UpdatePage {
        user: Some(user),
        id,
        form,
        error,
    })
}

/// `GET /login`
///
/// # Errors
/// Returns [`GatewayError::Render`] if the template fails to render.
pub fn login_page() -> Result<Html<String>, GatewayError> {
    html(&LoginPage { user: None })
}

/// `GET /register`, and the same page with `error` after a rejected submit.
///
/// # Errors
/// Returns [`GatewayError::Render`] if the template fails to render.
pub fn register_page(username: &str, error: Option<&str>) -> Result<Html<String>, GatewayError> {
    html(&RegisterPage {
        user: None,
        username,
        error,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cubicle_core::UserId;

    use super::*;

    fn sample_post() -> Post {
        Post::new(
            PostId::new(7),
            "<script>alert(1)</script>".to_owned(),
            "fish & chips".to_owned(),
            UserId::new(1),
            "alice".to_owned(),
            Utc::now(),
        )
    }

    fn viewer(id: i64, username: &str) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            username: username.to_owned(),
        }
    }

    fn rendered(page: Result<Html<String>, GatewayError>) -> String {
        match page {
            Ok(Html(body)) => body,
            Err(e) => panic!("render failed: {e}"),
        }
    }

    #[test]
    fn post_text_is_escaped() {
        let body = rendered(show(&sample_post(), None));
        assert!(!body.contains("<script>"), "title must be escaped");
        assert!(body.contains("&lt;script&gt;"));
        assert!(body.contains("fish &amp; chips"));
    }

    #[test]
    fn form_values_are_escaped_inside_attributes() {
        let form = PostForm::new(r#"" onfocus="alert(1)"#, "</textarea><b>");
        let body = rendered(update_form(PostId::new(3), &form, None, &viewer(1, "alice")));
        assert!(!body.contains(r#"" onfocus=""#), "quote must not close the attribute");
        assert!(!body.contains("</textarea><b>"));
        assert!(body.contains("&lt;b&gt;"));
    }

    #[test]
    fn username_in_nav_is_escaped() {
        let body = rendered(index(&[], Some(&viewer(1, "<i>al</i>"))));
        assert!(!body.contains("<i>al</i>"));
        assert!(body.contains("&lt;i&gt;al"));
        assert!(body.contains("No posts yet."));
    }

    #[test]
    fn edit_link_only_for_the_author() {
        let post = sample_post();
        let as_alice = rendered(index(std::slice::from_ref(&post), Some(&viewer(1, "alice"))));
        let as_bob = rendered(index(std::slice::from_ref(&post), Some(&viewer(2, "bob"))));
        let anonymous = rendered(index(std::slice::from_ref(&post), None));
        assert!(as_alice.contains("/7/update"));
        assert!(!as_bob.contains("/7/update"));
        assert!(!anonymous.contains("/7/update"));
        assert!(anonymous.contains("/login"), "anonymous nav offers a login link");
    }

    #[test]
    fn rejected_form_keeps_submitted_values() {
        let form = PostForm::new("", "draft body");
        let body = rendered(create_form(&form, Some("Title is required."), &viewer(1, "alice")));
        assert!(body.contains("Title is required."));
        assert!(body.contains("draft body"));
    }

    #[test]
    fn register_page_refills_the_username() {
        let body = rendered(register_page("erin", Some("User erin is already registered.")));
        assert!(body.contains(r#"value="erin""#));
        assert!(body.contains("User erin is already registered."));
    }
}
