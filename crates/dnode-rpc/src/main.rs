//! Dnode RPC Server - demo dnode endpoint over TCP.
//!
//! Every accepted connection gets its own copy of one template instance, so
//! all connections share the handler set while keeping separate callbacks.

mod handlers;
mod server;

use anyhow::Result;
use clap::Parser;
use dnode_core::{Detached, Dnode};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "dnode-rpc")]
#[command(about = "Dnode protocol server with demo methods")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Dnode RPC Server");

    let template = Dnode::builder()
        .diagnostics(args.debug)
        .build(Detached::new());
    handlers::register(&template);

    let mut handle = server::start_server(template, &args.host, args.port).await?;

    // Read by launchers that start the server on an OS-assigned port.
    println!("DNODE_PORT={}", handle.addr().port());

    info!("Dnode server running on {}", handle.addr());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    handle.shutdown();

    Ok(())
}
