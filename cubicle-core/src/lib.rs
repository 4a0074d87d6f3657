//! Core types for the Cubicle blog and code-execution services.
//!
//! Defines the domain types shared by the store and the HTTP gateway:
//! posts, users, credentials, row ids and form validation.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod id;
pub mod post;
pub mod user;

pub use error::CoreError;
pub use id::{PostId, UserId};
pub use post::{Post, PostForm};
pub use user::{Credentials, User};

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample_post(author: i64) -> Post {
        Post::new(
            PostId::new(7),
            "Hello".to_owned(),
            String::new(),
            UserId::new(author),
            "alice".to_owned(),
            Utc::now(),
        )
    }

    #[test]
    fn post_form_with_title_is_valid() {
        let form = PostForm::new("A title", "");
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn post_form_empty_title_is_rejected() {
        let form = PostForm::new("", "some body");
        assert_eq!(form.validate(), Err(CoreError::TitleRequired));
    }

    #[test]
    fn post_form_whitespace_title_is_rejected() {
        let form = PostForm::new(" \t\n", "some body");
        assert_eq!(form.validate(), Err(CoreError::TitleRequired));
    }

    #[test]
    fn title_required_message_is_user_facing() {
        assert_eq!(CoreError::TitleRequired.to_string(), "Title is required.");
    }

    #[test]
    fn post_form_from_post_copies_title_and_body() {
        let post = sample_post(1);
        let form = PostForm::from_post(&post);
        assert_eq!(form.title, "Hello");
        assert_eq!(form.body, "");
    }

    #[test]
    fn post_authorship_compares_user_ids() {
        let post = sample_post(1);
        assert!(post.is_authored_by(UserId::new(1)));
        assert!(!post.is_authored_by(UserId::new(2)));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("alice", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("alice"), "username should be visible");
        assert!(!printed.contains("hunter2"), "password must never be printed");
    }

    #[test]
    fn credentials_require_both_fields() {
        assert_eq!(Credentials::new("", "pw").validate(), Err(CoreError::UsernameRequired));
        assert_eq!(Credentials::new("bob", "").validate(), Err(CoreError::PasswordRequired));
        assert_eq!(Credentials::new("bob", "pw").validate(), Ok(()));
    }

    #[test]
    fn ids_display_as_plain_integers() {
        assert_eq!(PostId::new(42).to_string(), "42");
        assert_eq!(UserId::from(3).to_string(), "3");
        assert_eq!(PostId::new(9).get(), 9);
    }

    #[test]
    fn post_id_serializes_transparently() {
        let json = match serde_json::to_string(&PostId::new(5)) {
            Ok(s) => s,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(json, "5");
    }

    proptest::proptest! {
        #[test]
        fn proptest_any_title_with_visible_char_is_valid(
            prefix in "[ \t]{0,4}",
            word in "[a-zA-Z0-9]{1,16}",
            body in ".{0,32}",
        ) {
            let form = PostForm::new(format!("{prefix}{word}"), body);
            proptest::prop_assert!(form.validate().is_ok());
        }

        #[test]
        fn proptest_blank_titles_are_always_rejected(title in "[ \t\r\n]{0,12}") {
            let form = PostForm::new(title, "body");
            proptest::prop_assert_eq!(form.validate(), Err(CoreError::TitleRequired));
        }
    }
}
