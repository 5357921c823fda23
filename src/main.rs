use std::path::PathBuf;

use clap::Parser;

use forward_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use forward_proxy::lifecycle::signals;
use forward_proxy::net::Acceptor;
use forward_proxy::observability::init_logging;

/// Forwarding HTTP proxy. Request http://HOST:PORT/proxy/<URL>.
#[derive(Parser, Debug)]
#[command(name = "forward-proxy", version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind, overrides the file.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides the file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level, overrides the file.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load(&self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().load()?;
    init_logging(&config.observability)?;

    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let acceptor = Acceptor::bind(&config).await?;
    let port = acceptor.local_addr()?.port();
    let host = &config.listener.host;
    tracing::info!(
        "Started on {host}:{port}. Enter URL in format http://{host}:{port}/proxy/URL"
    );

    acceptor.run(signals::interrupt()).await?;
    Ok(())
}
