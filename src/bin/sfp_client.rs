// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use clap::Parser;
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{self, Duration};

/// Query client for the SFP monitor socket
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Monitor socket path
    #[clap(long, default_value = "/run/sfp-daemon/sfp.sock")]
    socket: PathBuf,

    /// Print the response exactly as received
    #[clap(long)]
    raw: bool,

    /// Command to send (GET CURRENT, GET STATIC, GET DYNAMIC, GET STATE, PING)
    #[clap(default_values_t = ["GET".to_string(), "CURRENT".to_string()])]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "warn"),
    );

    let args = Args::parse();
    let command = args.command.join(" ");
    log::debug!("Sending {:?} to {}", command, args.socket.display());

    let mut stream = UnixStream::connect(&args.socket).await.map_err(|e| {
        format!(
            "Cannot connect to {} (is the daemon running?): {}",
            args.socket.display(),
            e
        )
    })?;

    stream.write_all(format!("{}\n", command).as_bytes()).await?;
    // Closing our half lets the daemon answer and hang up
    stream.shutdown().await?;

    let mut response = String::new();
    time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .map_err(|_| "Timed out waiting for the daemon")??;

    if args.raw {
        print!("{}", response);
        return Ok(());
    }

    let (status_line, body) = response.split_once('\n').unwrap_or((response.as_str(), ""));
    println!("{}", status_line);
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(document) => println!("{}", serde_json::to_string_pretty(&document)?),
        Err(_) => print!("{}", body),
    }

    if !status_line.starts_with("STATUS 200") {
        std::io::stdout().flush()?;
        std::process::exit(1);
    }
    Ok(())
}
