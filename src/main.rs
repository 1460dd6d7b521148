//! Civicops cli
use clap::Parser;
#[macro_use]
extern crate clap;

use civicops::*;

/// Cli
#[derive(Debug, Parser)]
#[command(name = "civicops", about = "CivicHero operations cli.", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the notification relay server
    Serve(ServeOpts),
    /// Delete every document from every Firestore collection
    WipeFirestore(WipeFirestoreOpts),
    /// Delete every Firebase Authentication user
    WipeAuth(WipeOpts),
    /// Send a test SMS and email through the configured providers
    TestNotify(TestNotifyOpts),
    /// Inspect a single user document
    #[command(arg_required_else_help = true)]
    InspectUser(InspectOpts),
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    match args.command {
        Commands::Serve(opts) => {
            serve(opts)?;
        }
        Commands::WipeFirestore(opts) => {
            tracing_subscriber::fmt::init();
            let system = actix_rt::System::new();
            system.block_on(async { wipe_firestore(opts).await })?;
        }
        Commands::WipeAuth(opts) => {
            tracing_subscriber::fmt::init();
            let system = actix_rt::System::new();
            system.block_on(async { wipe_auth(opts).await })?;
        }
        Commands::TestNotify(opts) => {
            tracing_subscriber::fmt::init();
            let system = actix_rt::System::new();
            system.block_on(async { test_notify(opts).await })?;
        }
        Commands::InspectUser(opts) => {
            tracing_subscriber::fmt::init();
            let system = actix_rt::System::new();
            system.block_on(async { inspect_user(opts).await })?;
        }
    }
    Ok(())
}
