//! Destructive maintenance commands.
//!
//! Both wipes are one-off operator tools: they print a warning banner,
//! require typing the confirmation phrase, and then delete everything,
//! reporting counts as they go.

use crate::Result;
use civic_notify::admin::{is_permission_error, FirebaseAdmin};
use civic_notify::NotifyConfig;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use tracing::info;

const CONFIRM_PHRASE: &str = "DELETE ALL";

/// Firestore wipe options
#[derive(Debug, Clone, Parser)]
pub struct WipeFirestoreOpts {
    /// Skip the interactive confirmation prompt
    #[arg(long)]
    pub yes: bool,
    /// Also delete all Authentication users in the same run
    #[arg(long)]
    pub with_auth: bool,
}

/// Auth wipe options
#[derive(Debug, Clone, Parser)]
pub struct WipeOpts {
    /// Skip the interactive confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

fn banner(title: &str, lines: &[&str]) {
    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!("{title}");
    println!("{rule}");
    for line in lines {
        println!("{line}");
    }
    println!("{rule}");
}

/// Ask the operator to type the confirmation phrase. Anything else aborts.
fn confirm(question: &str) -> Result<bool> {
    print!("\n{question} (type \"{CONFIRM_PHRASE}\" to confirm): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;

    Ok(answer.trim() == CONFIRM_PHRASE)
}

fn collection_progress(collection: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {prefix}: {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(collection.to_string());
    pb
}

fn firestore_banner_lines(with_auth: bool) -> Vec<&'static str> {
    let mut lines = vec![
        "WARNING: This will DELETE ALL DATA!",
        "  - All Firestore collections and documents",
    ];
    if with_auth {
        lines.push("  - All Authentication users");
    }
    lines
}

pub async fn wipe_firestore(opts: WipeFirestoreOpts) -> Result<()> {
    banner(
        "FIRESTORE DATA CLEARING",
        &firestore_banner_lines(opts.with_auth),
    );

    if !opts.yes && !confirm("Are you sure you want to delete ALL data?")? {
        println!("\nOperation cancelled. Data was not deleted.");
        return Ok(());
    }

    let config = NotifyConfig::default();
    let admin = FirebaseAdmin::new(config.require_project_id()?);

    let collections = admin.list_collection_ids().await?;
    if collections.is_empty() {
        println!("\nFirestore is already empty!");
    } else {
        println!("\nFound {} collection(s):", collections.len());
        for collection in &collections {
            println!("  - {collection}");
        }

        let mut total = 0u64;
        for collection in &collections {
            let pb = collection_progress(collection);
            let deleted = admin
                .delete_collection(collection, |count| {
                    pb.set_message(format!("{count} documents deleted"));
                })
                .await?;
            if deleted == 0 {
                pb.finish_with_message("already empty");
            } else {
                pb.finish_with_message(format!("{deleted} documents deleted"));
            }
            total += deleted;
        }

        println!("\nFirestore cleared successfully!");
        println!("  Total documents deleted: {total}");
    }

    if opts.with_auth {
        println!("\nClearing Authentication users...");
        let deleted = clear_auth_users(&admin).await?;
        if deleted == 0 {
            println!("  No users to delete");
        } else {
            println!("  Total users deleted: {deleted}");
        }
    }

    println!("\nNext steps:");
    println!("  - Users will need to register again");
    println!("  - All complaints/issues have been deleted");
    println!("  - Admin accounts need to be recreated");

    Ok(())
}

pub async fn wipe_auth(opts: WipeOpts) -> Result<()> {
    banner(
        "DELETE ALL AUTHENTICATION USERS",
        &["WARNING: This will DELETE ALL authentication users!"],
    );

    if !opts.yes && !confirm("Are you sure you want to delete ALL users?")? {
        println!("\nOperation cancelled. Users were not deleted.");
        return Ok(());
    }

    let config = NotifyConfig::default();
    let admin = FirebaseAdmin::new(config.require_project_id()?);

    let deleted = clear_auth_users(&admin).await?;
    if deleted == 0 {
        println!("\nNo users to delete");
    }

    println!("\nAuthentication cleared successfully!");
    println!("  Total users deleted: {deleted}");

    Ok(())
}

/// Delete every Auth user, page by page. Returns the number deleted.
async fn clear_auth_users(admin: &FirebaseAdmin) -> Result<u64> {
    let mut deleted = 0u64;
    let mut page_token: Option<String> = None;

    loop {
        let (users, next) = match admin.list_users_page(page_token.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                print_permission_hint(&e);
                return Err(e);
            }
        };

        if users.is_empty() {
            break;
        }

        println!("\nFound {} user(s) to delete...", users.len());
        for user in &users {
            info!("Deleting user: {}", user.label());
        }

        let ids: Vec<String> = users.iter().map(|u| u.local_id.clone()).collect();
        if let Err(e) = admin.delete_users(&ids).await {
            print_permission_hint(&e);
            return Err(e);
        }
        deleted += users.len() as u64;
        println!("  Deleted {} users in this batch", users.len());

        page_token = next;
        if page_token.is_none() {
            break;
        }
    }

    Ok(deleted)
}

fn print_permission_hint(err: &anyhow::Error) {
    if is_permission_error(err) {
        println!("\nSolution: Enable the Identity Toolkit API");
        println!("  1. Open the Google Cloud console API library for identitytoolkit.googleapis.com");
        println!("  2. Click \"Enable\" and wait 1-2 minutes for it to propagate");
        println!("  3. Run this command again");
        println!("\n  OR delete the users from the Firebase console instead");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_mentions_auth_only_when_requested() {
        let plain = firestore_banner_lines(false);
        assert!(!plain.iter().any(|l| l.contains("Authentication")));

        let combined = firestore_banner_lines(true);
        assert!(combined
            .iter()
            .any(|l| l.contains("All Authentication users")));
    }
}
