use thiserror::Error;

/// Errors surfaced by the notification providers and config layer.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// Twilio REST error body. Code 0 means the body carried no error code.
    #[error("twilio error {code}: {message}")]
    Twilio { code: i64, message: String },

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("email address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("email build error: {0}")]
    Email(#[from] lettre::error::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
