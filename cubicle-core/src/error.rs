/// Validation errors produced by the `cubicle-core` crate.
///
/// The `Display` text is shown to the user next to the form that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A post was submitted without a usable title.
    #[error("Title is required.")]
    TitleRequired,

    /// A registration or login form had no username.
    #[error("Username is required.")]
    UsernameRequired,

    /// A registration or login form had no password.
    #[error("Password is required.")]
    PasswordRequired,
}
