//! Remote command transport
//!
//! Newline-delimited JSON over TCP. Every well-formed request is answered
//! with `{"ok":true}`: whatever goes wrong inside the station is logged
//! there and never reported back. Only malformed requests get an error.

pub mod client;
pub mod protocol;

pub use protocol::{Command, Reply};

use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::station::Station;

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(station: Arc<Station>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    run(listener, station, shutdown).await
}

/// Accept connections until `shutdown` resolves, then shut the station down
pub async fn run(
    listener: TcpListener,
    station: Arc<Station>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let local = listener.local_addr()?;
    info!(station = %station.name(), addr = %local, "listening for commands");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        let station = Arc::clone(&station);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(socket, peer, station).await {
                                warn!(%peer, "connection ended with error: {:#}", e);
                            }
                        });
                    }
                    Err(e) => warn!("accept failed: {}", e),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    station.shutdown().await;
    Ok(())
}

async fn handle_connection(
    socket: TcpStream,
    peer: SocketAddr,
    station: Arc<Station>,
) -> Result<()> {
    debug!(%peer, "client connected");
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Command>(&line) {
            Ok(command) => {
                debug!(%peer, ?command, "command received");
                let station = Arc::clone(&station);
                tokio::task::spawn_blocking(move || command.apply(&station))
                    .await
                    .map(|_| Reply::ok())
                    .unwrap_or_else(|e| Reply::error(format!("command failed: {}", e)))
            }
            Err(e) => Reply::error(format!("malformed request: {}", e)),
        };

        let mut out = serde_json::to_vec(&reply)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
    }

    debug!(%peer, "client disconnected");
    Ok(())
}
