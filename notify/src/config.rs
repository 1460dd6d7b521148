//! Environment-driven configuration for the relay and admin commands.
//!
//! All values come from the environment; `Default` reads them with sensible
//! fallbacks so the binaries can construct a config without a file.

use crate::error::NotifyError;

/// Relay and provider configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Google Cloud project hosting Firestore and Firebase Auth.
    pub project_id: Option<String>,
    // Twilio credentials and sender number
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
    // Gmail SMTP credentials (app password, not the account password)
    pub gmail_username: Option<String>,
    pub gmail_app_password: Option<String>,
    /// Email dispatch is opt-in; SMS is always attempted when configured.
    pub email_enabled: bool,
    /// HTTP listen port for the relay server.
    pub port: u16,
    /// Prefixed to bare 10-digit phone numbers from user profiles.
    pub default_country_code: String,
    // Diagnostic targets for the test-notify command
    pub test_phone: Option<String>,
    pub test_email: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            project_id: std::env::var("FIRESTORE_PROJECT_ID")
                .or_else(|_| std::env::var("GOOGLE_CLOUD_PROJECT"))
                .or_else(|_| std::env::var("GCP_PROJECT"))
                .ok(),
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok(),
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN").ok(),
            twilio_from_number: std::env::var("TWILIO_PHONE_NUMBER").ok(),
            gmail_username: std::env::var("GMAIL_USERNAME").ok(),
            gmail_app_password: std::env::var("GMAIL_APP_PASSWORD").ok(),
            email_enabled: std::env::var("EMAIL_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            default_country_code: std::env::var("DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "+91".to_string()),
            test_phone: std::env::var("TEST_PHONE").ok(),
            test_email: std::env::var("TEST_EMAIL")
                .or_else(|_| std::env::var("GMAIL_USERNAME"))
                .ok(),
        }
    }
}

impl NotifyConfig {
    /// Project id is required by everything that touches Firestore or Auth.
    pub fn require_project_id(&self) -> Result<&str, NotifyError> {
        self.project_id
            .as_deref()
            .ok_or(NotifyError::MissingConfig(
                "FIRESTORE_PROJECT_ID / GOOGLE_CLOUD_PROJECT / GCP_PROJECT",
            ))
    }

    pub fn twilio_configured(&self) -> bool {
        self.twilio_account_sid.is_some()
            && self.twilio_auth_token.is_some()
            && self.twilio_from_number.is_some()
    }

    pub fn email_configured(&self) -> bool {
        self.gmail_username.is_some() && self.gmail_app_password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VARS: &[&str] = &[
        "FIRESTORE_PROJECT_ID",
        "GOOGLE_CLOUD_PROJECT",
        "GCP_PROJECT",
        "TWILIO_ACCOUNT_SID",
        "TWILIO_AUTH_TOKEN",
        "TWILIO_PHONE_NUMBER",
        "GMAIL_USERNAME",
        "GMAIL_APP_PASSWORD",
        "EMAIL_ENABLED",
        "PORT",
        "DEFAULT_COUNTRY_CODE",
        "TEST_PHONE",
        "TEST_EMAIL",
    ];

    fn with_clean_env<F: Fn() + std::panic::RefUnwindSafe>(f: F) {
        let vars: Vec<(&str, Option<&str>)> = ALL_VARS.iter().map(|v| (*v, None)).collect();
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn defaults_without_env() {
        with_clean_env(|| {
            let config = NotifyConfig::default();
            assert_eq!(config.project_id, None);
            assert_eq!(config.port, 3000);
            assert_eq!(config.default_country_code, "+91");
            assert!(!config.email_enabled);
            assert!(!config.twilio_configured());
            assert!(!config.email_configured());
            assert!(config.require_project_id().is_err());
        });
    }

    #[test]
    fn project_id_resolution_chain() {
        temp_env::with_vars(
            [
                ("FIRESTORE_PROJECT_ID", None),
                ("GOOGLE_CLOUD_PROJECT", Some("civicissue-aae6d")),
                ("GCP_PROJECT", Some("ignored")),
            ],
            || {
                let config = NotifyConfig::default();
                assert_eq!(config.require_project_id().unwrap(), "civicissue-aae6d");
            },
        );
    }

    #[test]
    fn email_enabled_accepts_true_and_one() {
        temp_env::with_var("EMAIL_ENABLED", Some("true"), || {
            assert!(NotifyConfig::default().email_enabled);
        });
        temp_env::with_var("EMAIL_ENABLED", Some("1"), || {
            assert!(NotifyConfig::default().email_enabled);
        });
        temp_env::with_var("EMAIL_ENABLED", Some("yes"), || {
            assert!(!NotifyConfig::default().email_enabled);
        });
    }

    #[test]
    fn test_email_falls_back_to_gmail_username() {
        temp_env::with_vars(
            [
                ("TEST_EMAIL", None),
                ("GMAIL_USERNAME", Some("ops@civichero.app")),
            ],
            || {
                let config = NotifyConfig::default();
                assert_eq!(config.test_email.as_deref(), Some("ops@civichero.app"));
            },
        );
    }
}
