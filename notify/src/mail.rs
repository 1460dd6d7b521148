//! Gmail SMTP mailer.
//!
//! Uses an app password against smtp.gmail.com; all notification emails are
//! plain text with a "CivicHero" sender display name.

use crate::config::NotifyConfig;
use crate::error::NotifyError;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

const GMAIL_SMTP_RELAY: &str = "smtp.gmail.com";
const SENDER_NAME: &str = "CivicHero";

#[derive(Debug)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    username: String,
}

impl Mailer {
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let username = config
            .gmail_username
            .clone()
            .ok_or(NotifyError::MissingConfig("GMAIL_USERNAME"))?;
        let password = config
            .gmail_app_password
            .clone()
            .ok_or(NotifyError::MissingConfig("GMAIL_APP_PASSWORD"))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(GMAIL_SMTP_RELAY)?
            .credentials(Credentials::new(username.clone(), password))
            .build();

        Ok(Self { transport, username })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check that the relay accepts our credentials without sending anything.
    pub async fn verify(&self) -> Result<bool, NotifyError> {
        Ok(self.transport.test_connection().await?)
    }

    /// Send one plain-text email. Returns the SMTP reply code on success.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, NotifyError> {
        let from: Mailbox = format!("{} <{}>", SENDER_NAME, self.username).parse()?;
        let message = Message::builder()
            .from(from)
            .to(to.parse()?)
            .subject(subject)
            .body(body.to_string())?;

        let response = self.transport.send(message).await?;
        let reply = response.code().to_string();
        info!("Email sent to {}: {}", to, reply);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gmail_config() -> NotifyConfig {
        temp_env::with_vars(
            [
                ("GMAIL_USERNAME", Some("civichero.notify@gmail.com")),
                ("GMAIL_APP_PASSWORD", Some("abcd efgh ijkl mnop")),
            ],
            NotifyConfig::default,
        )
    }

    #[actix_rt::test]
    async fn mailer_requires_both_credentials() {
        let mut config = gmail_config();
        assert!(Mailer::from_config(&config).is_ok());

        config.gmail_app_password = None;
        let err = Mailer::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            NotifyError::MissingConfig("GMAIL_APP_PASSWORD")
        ));
    }

    #[actix_rt::test]
    async fn sender_mailbox_parses_with_display_name() {
        let mailer = Mailer::from_config(&gmail_config()).unwrap();
        let from: Mailbox = format!("{} <{}>", SENDER_NAME, mailer.username())
            .parse()
            .unwrap();
        assert_eq!(from.name.as_deref(), Some("CivicHero"));
    }
}
