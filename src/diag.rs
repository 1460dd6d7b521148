//! Ad-hoc diagnostics for notification delivery and Firestore access.
//!
//! These mirror what the team reaches for when deliveries go missing:
//! `test-notify` exercises the Twilio and Gmail credentials end to end,
//! `inspect-user` shows what the relay would see for one citizen.

use crate::Result;
use chrono::Local;
use civic_notify::directory::UserDirectory;
use civic_notify::mail::Mailer;
use civic_notify::sms::{error_hint, SmsClient};
use civic_notify::{NotifyConfig, NotifyError};
use clap::Parser;

/// Notification delivery test options
#[derive(Debug, Clone, Parser)]
pub struct TestNotifyOpts {
    /// Destination phone number (overrides TEST_PHONE)
    #[arg(long, value_name = "E164")]
    pub phone: Option<String>,
    /// Destination email address (overrides TEST_EMAIL)
    #[arg(long, value_name = "ADDR")]
    pub email: Option<String>,
}

fn section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

fn set_or_missing(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "set"
    } else {
        "MISSING"
    }
}

#[derive(Debug)]
enum ChannelOutcome {
    Skipped(&'static str),
    Sent(String),
    Failed(String),
}

pub async fn test_notify(opts: TestNotifyOpts) -> Result<()> {
    let config = NotifyConfig::default();

    println!("Testing CivicHero notification services");
    println!("\nEnvironment check:");
    println!("  TWILIO_ACCOUNT_SID:  {}", set_or_missing(&config.twilio_account_sid));
    println!("  TWILIO_AUTH_TOKEN:   {}", set_or_missing(&config.twilio_auth_token));
    println!("  TWILIO_PHONE_NUMBER: {}", set_or_missing(&config.twilio_from_number));
    println!("  GMAIL_USERNAME:      {}", set_or_missing(&config.gmail_username));
    println!("  GMAIL_APP_PASSWORD:  {}", set_or_missing(&config.gmail_app_password));
    println!("  EMAIL_ENABLED:       {}", config.email_enabled);

    let sms_outcome = test_sms(&config, opts.phone.as_deref()).await;
    let email_outcome = test_email(&config, opts.email.as_deref()).await;

    section("Test Summary");
    report_outcome("SMS Service (Twilio)", &sms_outcome);
    report_outcome("Email Service (Gmail)", &email_outcome);

    let failed = matches!(sms_outcome, ChannelOutcome::Failed(_))
        || matches!(email_outcome, ChannelOutcome::Failed(_));
    if failed {
        anyhow::bail!("notification test failed");
    }
    Ok(())
}

fn report_outcome(label: &str, outcome: &ChannelOutcome) {
    match outcome {
        ChannelOutcome::Skipped(reason) => println!("  {label}: SKIPPED ({reason})"),
        ChannelOutcome::Sent(detail) => println!("  {label}: WORKING ({detail})"),
        ChannelOutcome::Failed(error) => println!("  {label}: FAILED ({error})"),
    }
}

async fn test_sms(config: &NotifyConfig, override_phone: Option<&str>) -> ChannelOutcome {
    section("Testing SMS Service (Twilio)");

    if !config.twilio_configured() {
        println!("Skipping SMS test - Twilio credentials missing");
        return ChannelOutcome::Skipped("Twilio credentials missing");
    }
    let Some(to) = override_phone
        .map(str::to_string)
        .or_else(|| config.test_phone.clone())
    else {
        println!("Skipping SMS test - TEST_PHONE not set");
        return ChannelOutcome::Skipped("TEST_PHONE not set");
    };

    let client = match SmsClient::from_config(config) {
        Ok(client) => client,
        Err(e) => return ChannelOutcome::Failed(e.to_string()),
    };

    let body = format!(
        "CivicHero test SMS\n\nThis is a test message from the CivicHero notification service. \
         If you receive this, SMS is working correctly.\n\nTime: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    println!("\nSending test SMS...");
    println!("  From: {}", client.from_number());
    println!("  To:   {to}");

    match client.send(&to, &body).await {
        Ok(receipt) => {
            println!("\nSMS sent successfully!");
            println!("  Message SID: {}", receipt.sid);
            if let Some(status) = &receipt.status {
                println!("  Status: {status}");
            }
            ChannelOutcome::Sent(format!("sid {}", receipt.sid))
        }
        Err(e) => {
            println!("\nSMS test failed: {e}");
            if let NotifyError::Twilio { code, .. } = &e {
                if let Some(hint) = error_hint(*code) {
                    println!("  Hint: {hint}");
                }
            }
            ChannelOutcome::Failed(e.to_string())
        }
    }
}

async fn test_email(config: &NotifyConfig, override_email: Option<&str>) -> ChannelOutcome {
    section("Testing Email Service (Gmail)");

    if !config.email_configured() {
        println!("Skipping email test - Gmail credentials missing");
        return ChannelOutcome::Skipped("Gmail credentials missing");
    }
    if !config.email_enabled {
        println!("Skipping email test - EMAIL_ENABLED is not \"true\"");
        return ChannelOutcome::Skipped("EMAIL_ENABLED is not true");
    }
    let Some(to) = override_email
        .map(str::to_string)
        .or_else(|| config.test_email.clone())
    else {
        println!("Skipping email test - TEST_EMAIL not set");
        return ChannelOutcome::Skipped("TEST_EMAIL not set");
    };

    let mailer = match Mailer::from_config(config) {
        Ok(mailer) => mailer,
        Err(e) => return ChannelOutcome::Failed(e.to_string()),
    };

    println!("\nVerifying Gmail connection...");
    match mailer.verify().await {
        Ok(true) => println!("Gmail connection verified"),
        Ok(false) => {
            println!("Gmail connection check failed");
            return ChannelOutcome::Failed("SMTP connection check failed".to_string());
        }
        Err(e) => {
            println!("Gmail connection failed: {e}");
            return ChannelOutcome::Failed(e.to_string());
        }
    }

    let subject = "CivicHero Test Email";
    let body = format!(
        "This is a test email from the CivicHero notification service.\n\n\
         If you receive this email, the Gmail service is working correctly.\n\n\
         Test details:\n- Time: {}\n- From: {}\n\nThank you for using CivicHero!",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        mailer.username()
    );

    println!("\nSending test email...");
    println!("  From: {}", mailer.username());
    println!("  To:   {to}");

    match mailer.send(&to, subject, &body).await {
        Ok(reply) => {
            println!("\nEmail sent successfully!");
            println!("  SMTP reply: {reply}");
            ChannelOutcome::Sent(format!("smtp {reply}"))
        }
        Err(e) => {
            println!("\nEmail test failed: {e}");
            if matches!(e, NotifyError::Smtp(_)) {
                println!("  Hint: use a Gmail App Password, not the account password");
            }
            ChannelOutcome::Failed(e.to_string())
        }
    }
}

/// User inspection options
#[derive(Debug, Clone, Parser)]
pub struct InspectOpts {
    /// Firebase uid of the user document to inspect
    #[arg(value_name = "UID")]
    pub user_id: String,
    /// Also search the users collection for this exact full name
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

pub async fn inspect_user(opts: InspectOpts) -> Result<()> {
    let config = NotifyConfig::default();
    let directory = UserDirectory::new(config.require_project_id()?).await?;

    println!("Testing access to user document...");
    println!("  User ID: {}", opts.user_id);
    println!("  Document path: users/{}\n", opts.user_id);

    println!("Test 1: Getting specific document...");
    match directory.fetch_user_with_fields(&opts.user_id).await? {
        Some((profile, keys)) => {
            println!("  Document found!");
            println!("  Data keys: [{}]", keys.join(", "));
            println!("  Email:     {}", profile.email().unwrap_or("MISSING"));
            println!("  Phone:     {}", profile.phone().unwrap_or("MISSING"));
            println!("  Full Name: {}", profile.display_name());
        }
        None => println!("  Document does not exist"),
    }

    println!("\nTest 2: Listing users in collection...");
    let sample = directory.sample_user_ids(10).await?;
    println!("  Found {} users:", sample.len());
    for id in &sample {
        if id == &opts.user_id {
            println!("  * {id} <-- THIS ONE!");
        } else {
            println!("    {id}");
        }
    }

    if let Some(name) = &opts.name {
        println!("\nTest 3: Searching for users with fullName \"{name}\"...");
        let matches = directory.find_users_by_name(name, 5).await?;
        println!("  Found {} users:", matches.len());
        for id in &matches {
            if id == &opts.user_id {
                println!("  - {id} (matches the userId we're looking for!)");
            } else {
                println!("  - {id}");
            }
        }
    }

    Ok(())
}
