//! echo-client: send lines to an echo-reactor server and print the replies.

use clap::Parser;
use echo_reactor::client::{ConnectOptions, EchoClient};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the echo client
#[derive(Parser, Debug)]
#[command(name = "echo-client")]
#[command(version = "0.1.0")]
#[command(about = "Send lines to an echo-reactor server", long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Lines to send, one round trip each
    #[arg(required = true)]
    lines: Vec<String>,

    /// Read timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = ConnectOptions {
        read_timeout: Some(Duration::from_millis(args.timeout_ms)),
        ..ConnectOptions::default()
    };
    let mut client = EchoClient::connect(args.addr, &options)?;

    for line in &args.lines {
        match client.exchange(line)? {
            Some(reply) => println!("{reply}"),
            None => {
                eprintln!("server closed the connection");
                break;
            }
        }
    }

    client.shutdown()?;
    Ok(())
}
