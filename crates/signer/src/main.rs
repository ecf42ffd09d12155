use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use local_signer::{ConfigStore, lifecycle, logging, server::DEFAULT_PORT};
use tracing::error;

#[derive(Parser)]
#[command(version, about = "Local HTTP service that serves a public key and signs data")]
struct Args {
    #[clap(long, env = "LOCAL_SIGNER_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST), global = true)]
    host: IpAddr,
    #[clap(long, env = "LOCAL_SIGNER_PORT", default_value_t = DEFAULT_PORT, global = true)]
    port: u16,
    /// Defaults to config.json next to the executable.
    #[clap(long, env = "LOCAL_SIGNER_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default).
    Serve,
    /// Validate and store the key files to use.
    Configure {
        /// PEM certificate served from /public-key.
        #[clap(long)]
        public_key: PathBuf,
        /// Unencrypted PEM RSA private key used by /sign.
        #[clap(long)]
        private_key: PathBuf,
    },
    /// Print the stored configuration.
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();

    let store = match args.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::beside_executable()?,
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let addr = SocketAddr::new(args.host, args.port);
            lifecycle::serve(addr, store, shutdown_signal()).await
        }
        Command::Configure {
            public_key,
            private_key,
        } => {
            lifecycle::configure(&store, &public_key, &private_key)?;
            println!("Saved configuration to {}", store.path().display());
            Ok(())
        }
        Command::Show => {
            let config = store.load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("complete: {}", config.is_complete());
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
