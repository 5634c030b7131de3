//! Entry point for `gbn-sender`.
//!
//! Parses CLI arguments, sets up logging, opens the input file and the UDP
//! socket, then hands everything to [`GbnSender`].  Any failure here or
//! during the transfer exits with a non-zero status.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use gbn_sender::config::{DEFAULT_PORT, DEFAULT_TIMEOUT, WINDOW_SIZE};
use gbn_sender::{GbnSender, SenderConfig, Socket};

/// Send a file reliably over UDP using Go-Back-N.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_flag = true)]
struct Cli {
    /// File to send.
    #[arg(short = 'f', long = "file")]
    filename: PathBuf,

    /// Receiver host name or address.
    #[arg(short = 'h', long = "host")]
    hostname: String,

    /// Receiver UDP port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Debug level: 0 error, 1 warn, 2 info, 3 debug, 4+ trace.
    /// Overrides RUST_LOG when given.
    #[arg(short, long = "debug")]
    debug_level: Option<u8>,

    /// Number of datagrams allowed in flight.
    #[arg(long, default_value_t = WINDOW_SIZE)]
    window_size: usize,

    /// Retransmission timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

fn level_filter(debug_level: u8) -> LevelFilter {
    match debug_level {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if let Some(level) = cli.debug_level {
        logger.filter_level(level_filter(level));
    }
    logger.init();

    log::trace!("arguments: {cli:?}");

    let input = tokio::fs::File::open(&cli.filename)
        .await
        .with_context(|| format!("could not open input file {}", cli.filename.display()))?;

    let config = SenderConfig {
        window_size: cli.window_size,
        timeout: Duration::from_millis(cli.timeout_ms),
        ..SenderConfig::default()
    };
    let socket = Socket::connect(&cli.hostname, cli.port)
        .await
        .with_context(|| format!("could not reach {}:{}", cli.hostname, cli.port))?;
    log::info!(
        "sending {} to {} from {}",
        cli.filename.display(),
        socket.peer(),
        socket.local_addr
    );

    let mut sender = GbnSender::new(config, input, socket)?;
    let stats = sender.run().await.context("transfer aborted")?;
    log::info!("done: {stats:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn required_arguments_and_defaults() {
        let cli = Cli::try_parse_from(["gbn-sender", "-f", "in.bin", "-h", "example.com"]).unwrap();
        assert_eq!(cli.filename, PathBuf::from("in.bin"));
        assert_eq!(cli.hostname, "example.com");
        assert_eq!(cli.port, DEFAULT_PORT);
        assert_eq!(cli.debug_level, None);
        assert_eq!(cli.window_size, WINDOW_SIZE);
    }

    #[test]
    fn missing_hostname_is_an_error() {
        assert!(Cli::try_parse_from(["gbn-sender", "-f", "in.bin"]).is_err());
    }

    #[test]
    fn optional_port_and_debug() {
        let cli = Cli::try_parse_from([
            "gbn-sender", "-f", "x", "-h", "localhost", "-p", "9000", "-d", "3",
        ])
        .unwrap();
        assert_eq!(cli.port, 9000);
        assert_eq!(level_filter(cli.debug_level.unwrap()), LevelFilter::Debug);
    }

    #[test]
    fn non_numeric_port_is_an_error() {
        assert!(Cli::try_parse_from(["gbn-sender", "-f", "x", "-h", "y", "-p", "lots"]).is_err());
    }
}
