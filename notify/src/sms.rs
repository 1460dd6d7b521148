//! Twilio SMS client.
//!
//! Thin wrapper over the Messages REST endpoint; no retries, failures are
//! reported back to the caller as-is.

use crate::config::NotifyConfig;
use crate::error::NotifyError;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::{info, warn};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Successful send receipt.
#[derive(Debug, Clone)]
pub struct SmsReceipt {
    pub sid: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug)]
pub struct SmsClient {
    http_client: HttpClient,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl SmsClient {
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let account_sid = config
            .twilio_account_sid
            .clone()
            .ok_or(NotifyError::MissingConfig("TWILIO_ACCOUNT_SID"))?;
        let auth_token = config
            .twilio_auth_token
            .clone()
            .ok_or(NotifyError::MissingConfig("TWILIO_AUTH_TOKEN"))?;
        let from_number = config
            .twilio_from_number
            .clone()
            .ok_or(NotifyError::MissingConfig("TWILIO_PHONE_NUMBER"))?;

        Ok(Self {
            http_client: HttpClient::new(),
            account_sid,
            auth_token,
            from_number,
        })
    }

    pub fn from_number(&self) -> &str {
        &self.from_number
    }

    /// Send one SMS. The destination must already be in E.164 form.
    pub async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, NotifyError> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            TWILIO_API_BASE, self.account_sid
        );

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", &self.from_number), ("Body", body)])
            .send()
            .await?;

        if response.status().is_success() {
            let message: TwilioMessageResponse = response.json().await?;
            info!("SMS sent to {}: {}", to, message.sid);
            return Ok(SmsReceipt {
                sid: message.sid,
                status: message.status,
            });
        }

        let status = response.status();
        let error: TwilioErrorResponse = response.json().await.unwrap_or(TwilioErrorResponse {
            code: None,
            message: None,
        });
        let code = error.code.unwrap_or(0);
        let message = error
            .message
            .unwrap_or_else(|| format!("Twilio request failed with HTTP {}", status));
        warn!("SMS failed to {}: {} ({})", to, message, code);
        Err(NotifyError::Twilio { code, message })
    }
}

/// Operator hints for the Twilio error codes the team runs into most.
pub fn error_hint(code: i64) -> Option<&'static str> {
    match code {
        21211 => Some(
            "Invalid phone number format. Make sure it includes a country code (e.g., +91XXXXXXXXXX)",
        ),
        21608 => Some("Unverified phone number. Verify this number in the Twilio console first."),
        20003 => Some("Authentication failed. Check TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twilio_config() -> NotifyConfig {
        temp_env::with_vars(
            [
                ("TWILIO_ACCOUNT_SID", Some("ACxxxxxxxx")),
                ("TWILIO_AUTH_TOKEN", Some("secret")),
                ("TWILIO_PHONE_NUMBER", Some("+15005550006")),
            ],
            NotifyConfig::default,
        )
    }

    #[test]
    fn client_requires_all_three_settings() {
        let mut config = twilio_config();
        assert!(SmsClient::from_config(&config).is_ok());

        config.twilio_from_number = None;
        let err = SmsClient::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            NotifyError::MissingConfig("TWILIO_PHONE_NUMBER")
        ));
    }

    #[test]
    fn error_body_parsing() {
        let error: TwilioErrorResponse = serde_json::from_str(
            r#"{"code": 21211, "message": "The 'To' number is not a valid phone number.", "status": 400}"#,
        )
        .unwrap();
        assert_eq!(error.code, Some(21211));
        assert!(error.message.unwrap().contains("not a valid phone number"));
    }

    #[test]
    fn success_body_parsing() {
        let message: TwilioMessageResponse = serde_json::from_str(
            r#"{"sid": "SM1234", "status": "queued", "to": "+919876543210"}"#,
        )
        .unwrap();
        assert_eq!(message.sid, "SM1234");
        assert_eq!(message.status.as_deref(), Some("queued"));
    }

    #[test]
    fn hints_cover_the_common_codes() {
        assert!(error_hint(21211).unwrap().contains("country code"));
        assert!(error_hint(21608).unwrap().contains("Unverified"));
        assert!(error_hint(20003).unwrap().contains("Authentication"));
        assert!(error_hint(99999).is_none());
    }
}
