use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use pwhash::HashConfig;
use std::net::SocketAddr;

/// Longest processing delay accepted on the command line (one day).
const MAX_PROCESSING_DELAY_SECS: u64 = 86_400;

/// Runtime configuration for the `pwhash-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first). The defaults listen on port 8080 with a
/// five second processing delay.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pwhash-server",
    version,
    about = "An HTTP service that hashes passwords after a fixed delay"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Seconds each hash request waits before it is processed. The same delay
    /// applies between a shutdown request and the listener closing.
    ///
    /// Environment variable: `PROCESSING_DELAY_SECS`
    #[arg(long, env = "PROCESSING_DELAY_SECS", default_value_t = 5)]
    pub processing_delay: u64,

    /// Value the request ID counter starts from; the first request receives
    /// this value plus one. Must be below `u64::MAX`.
    ///
    /// Environment variable: `INITIAL_REQUEST_ID`
    #[arg(long, env = "INITIAL_REQUEST_ID", default_value_t = 0)]
    pub initial_request_id: u64,

    /// Seconds to wait for in-flight hash requests after the listener stops.
    /// Zero exits without waiting.
    ///
    /// Environment variable: `DRAIN_TIMEOUT_SECS`
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub processing_delay: Duration,
    pub initial_request_id: u64,
    pub drain_timeout: Duration,
}

impl ServerConfig {
    pub fn hash_config(&self) -> HashConfig {
        HashConfig {
            processing_delay: self.processing_delay,
            initial_request_id: self.initial_request_id,
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let server_addr: SocketAddr = args.server_addr.parse().with_context(|| {
            format!("SERVER_ADDR ({}) is not a socket address", args.server_addr)
        })?;

        if args.processing_delay > MAX_PROCESSING_DELAY_SECS {
            bail!(
                "PROCESSING_DELAY_SECS ({}) exceeds the maximum of {} seconds",
                args.processing_delay,
                MAX_PROCESSING_DELAY_SECS
            );
        }

        if args.initial_request_id == u64::MAX {
            bail!(
                "INITIAL_REQUEST_ID ({}) leaves no room for a next request ID",
                args.initial_request_id
            );
        }

        Ok(Self {
            server_addr,
            processing_delay: Duration::from_secs(args.processing_delay),
            initial_request_id: args.initial_request_id,
            drain_timeout: Duration::from_secs(args.drain_timeout),
        })
    }
}
