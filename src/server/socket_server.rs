// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Unix domain socket server
//!
//! The server never owns a task. The poll loop calls [`SocketServer::service`]
//! once per iteration to accept pending connections and answer every complete
//! request line, and [`SocketServer::wait_for_activity`] while it sleeps so
//! clients do not wait for the next iteration. Client sockets are only read
//! with non-blocking `try_read`, a client with nothing to say costs nothing.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::time;

use super::protocol::{handle_command, Command};
use crate::config::SocketConfig;
use crate::state::StateStore;

/// Longest accepted request line
const MAX_LINE_LEN: usize = 1024;
/// Time a client gets to take a whole response
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

struct Client {
    id: u64,
    stream: UnixStream,
    buffer: Vec<u8>,
}

/// Local query socket with a bounded number of clients
pub struct SocketServer {
    listener: UnixListener,
    path: PathBuf,
    max_connections: usize,
    clients: Vec<Client>,
    next_client_id: u64,
}

impl SocketServer {
    /// Bind the socket described by `config`.
    ///
    /// Creates the parent directory when needed, replaces a stale socket file
    /// and applies the configured file mode. Must be called from within a
    /// tokio runtime.
    pub fn bind(config: &SocketConfig) -> Result<Self> {
        let path = config.path.clone();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating socket directory {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create socket directory {:?}", parent)
                })?;
            }
        }

        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed stale socket {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove stale socket {:?}", path))
            }
        }

        let listener = UnixListener::bind(&path)
            .with_context(|| format!("Failed to bind socket {:?}", path))?;

        fs::set_permissions(&path, fs::Permissions::from_mode(config.permissions))
            .with_context(|| format!("Failed to set permissions on {:?}", path))?;

        info!(
            "Listening on {:?} (mode {:o}, max {} clients)",
            path, config.permissions, config.max_connections
        );

        Ok(Self {
            listener,
            path,
            max_connections: config.max_connections,
            clients: Vec::new(),
            next_client_id: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Accept pending connections and answer buffered requests without waiting.
    pub async fn service(&mut self, store: &StateStore) {
        while let Some(accepted) = self.listener.accept().now_or_never() {
            match accepted {
                Ok((stream, _)) => self.admit(stream),
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    break;
                }
            }
        }

        let mut i = 0;
        while i < self.clients.len() {
            if serve_client(&mut self.clients[i], store).await {
                i += 1;
            } else {
                let client = self.clients.remove(i);
                debug!(
                    "Client {} disconnected ({} remaining)",
                    client.id,
                    self.clients.len()
                );
            }
        }
    }

    /// Wait until a connection is pending or a client has something to read.
    ///
    /// A connection arriving here is admitted right away. Cancel safe.
    pub async fn wait_for_activity(&mut self) {
        let accepted = {
            let readable: Vec<_> = self
                .clients
                .iter()
                .map(|client| Box::pin(client.stream.readable()))
                .collect();
            let any_readable = async move {
                if readable.is_empty() {
                    futures::future::pending::<()>().await;
                } else {
                    let _ = futures::future::select_all(readable).await;
                }
            };

            tokio::select! {
                accepted = self.listener.accept() => Some(accepted),
                _ = any_readable => None,
            }
        };

        match accepted {
            Some(Ok((stream, _))) => self.admit(stream),
            Some(Err(e)) => warn!("Failed to accept connection: {}", e),
            None => {}
        }
    }

    fn admit(&mut self, stream: UnixStream) {
        if self.clients.len() >= self.max_connections {
            warn!(
                "Refusing connection, {} clients already connected",
                self.clients.len()
            );
            drop(stream);
            return;
        }
        self.next_client_id += 1;
        debug!("Client {} connected", self.next_client_id);
        self.clients.push(Client {
            id: self.next_client_id,
            stream,
            buffer: Vec::new(),
        });
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("Could not remove socket {:?}: {}", self.path, e);
        }
    }
}

/// Drain what the client sent and answer each complete line.
///
/// Returns `false` once the client is gone.
async fn serve_client(client: &mut Client, store: &StateStore) -> bool {
    let mut eof = false;
    let mut chunk = [0u8; 512];
    loop {
        match client.stream.try_read(&mut chunk) {
            Ok(0) => {
                eof = true;
                break;
            }
            Ok(n) => {
                client.buffer.extend_from_slice(&chunk[..n]);
                // The rest waits for the next pass
                if client.buffer.len() > MAX_LINE_LEN {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                debug!("Client {} read error: {}", client.id, e);
                return false;
            }
        }
    }

    while let Some(end) = client.buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = client.buffer.drain(..=end).collect();
        if !respond(client, &line, store).await {
            return false;
        }
    }

    // A final request may come without its newline
    if (eof && !client.buffer.is_empty()) || client.buffer.len() > MAX_LINE_LEN {
        let line = std::mem::take(&mut client.buffer);
        if !respond(client, &line, store).await {
            return false;
        }
    }

    !eof
}

async fn respond(client: &mut Client, line: &[u8], store: &StateStore) -> bool {
    let command = Command::parse(&String::from_utf8_lossy(line));
    debug!("Client {} sent {:?}", client.id, command);
    let response = handle_command(&command, store);

    match time::timeout(
        WRITE_TIMEOUT,
        client.stream.write_all(response.to_wire().as_bytes()),
    )
    .await
    {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("Client {} write error: {}", client.id, e);
            false
        }
        Err(_) => {
            warn!("Client {} did not take its response in time", client.id);
            false
        }
    }
}
