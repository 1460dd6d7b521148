use crate::Result;
use civic_notify::{server, NotifyConfig};
use clap::Parser;
use tracing::info;

/// Start relay server options
#[derive(Debug, Clone, Parser)]
pub struct ServeOpts {
    /// Listen port (overrides the PORT environment variable)
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,
}

#[actix_rt::main]
pub async fn serve(opts: ServeOpts) -> Result<()> {
    tracing_subscriber::fmt::init();
    info!("Start notification relay server");

    let mut config = NotifyConfig::default();
    if let Some(port) = opts.port {
        config.port = port;
    }

    server::run(config).await?;
    info!("Notification relay server shutdown");

    Ok(())
}
