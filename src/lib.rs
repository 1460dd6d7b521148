//! Command implementations for the civicops cli.

pub mod diag;
pub mod serve;
pub mod wipe;

pub use diag::{inspect_user, test_notify, InspectOpts, TestNotifyOpts};
pub use serve::{serve, ServeOpts};
pub use wipe::{wipe_auth, wipe_firestore, WipeFirestoreOpts, WipeOpts};

pub type Result<T, E = anyhow::Error> = core::result::Result<T, E>;
