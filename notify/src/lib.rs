//! Notification relay and Firebase admin clients for the CivicHero
//! complaint tracker.
//!
//! This crate provides:
//! - Status-change notification dispatch: SMS via Twilio, email via Gmail SMTP
//! - Firestore user/issue document access for contact resolution
//! - Firestore and Firebase Auth admin REST clients for data wipes
//! - The actix-web relay server (`server::run`)

pub mod admin;
pub mod config;
pub mod directory;
pub mod error;
pub mod mail;
pub mod server;
pub mod sms;
pub mod status;

pub use config::NotifyConfig;
pub use error::NotifyError;
