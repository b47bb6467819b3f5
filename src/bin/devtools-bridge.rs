//! DevTools bridge server entry point.
//!
//! # Usage
//!
//! ```text
//! devtools-bridge [OPTIONS]
//!
//! Options:
//!   --bind <IP>              Listener address [default: 127.0.0.1]
//!   --client-port <PORT>     DevTools frontend port [default: 9222]
//!   --device-port <PORT>     Device port [default: 9223]
//!   --domain <NAME>          Extra domain accepted by `X.enable` (repeatable)
//!   --log-truncate <CHARS>   Characters of a message body kept in logs [default: 500]
//! ```
//!
//! Log filtering follows `RUST_LOG` (default `devtools_bridge=info`).

use std::net::IpAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use devtools_bridge::config::{DEFAULT_CLIENT_PORT, DEFAULT_DEVICE_PORT, DEFAULT_LOG_TRUNCATE_LEN};
use devtools_bridge::{BridgeConfig, BridgeServer, MiddlewareRegistry, Result};

/// CDP-style bridge between an instrumented device and a DevTools frontend.
#[derive(Debug, Parser)]
#[command(name = "devtools-bridge", version)]
struct Cli {
    /// Address both listeners bind to.
    #[arg(long, default_value = "127.0.0.1", env = "DEVTOOLS_BRIDGE_BIND")]
    bind: IpAddr,

    /// Port DevTools frontends connect to.
    #[arg(long, default_value_t = DEFAULT_CLIENT_PORT, env = "DEVTOOLS_BRIDGE_CLIENT_PORT")]
    client_port: u16,

    /// Port devices connect to.
    #[arg(long, default_value_t = DEFAULT_DEVICE_PORT, env = "DEVTOOLS_BRIDGE_DEVICE_PORT")]
    device_port: u16,

    /// Additional domain recognized before any device handshake.
    #[arg(long = "domain")]
    domains: Vec<String>,

    /// Characters of a message body written to the log.
    #[arg(long, default_value_t = DEFAULT_LOG_TRUNCATE_LEN, env = "DEVTOOLS_BRIDGE_LOG_TRUNCATE")]
    log_truncate: usize,
}

impl Cli {
    fn into_config(self) -> Result<BridgeConfig> {
        let mut builder = BridgeConfig::builder()
            .bind_ip(self.bind)
            .client_port(self.client_port)
            .device_port(self.device_port)
            .log_truncate_len(self.log_truncate);

        for domain in self.domains {
            builder = builder.known_domain(domain);
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("devtools_bridge=info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    let server = BridgeServer::bind(config, Arc::new(MiddlewareRegistry::new())).await?;

    info!(
        client = %server.client_addr(),
        device = %server.device_addr(),
        "Listening; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    server.shutdown();

    Ok(())
}
