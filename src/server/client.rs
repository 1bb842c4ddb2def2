//! Client side of the command transport

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::protocol::{Command, Reply};

/// Send one command and wait for the reply
pub async fn send(addr: &str, command: &Command) -> Result<Reply> {
    let socket = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to station at {}", addr))?;
    let (reader, mut writer) = socket.into_split();

    let mut request = serde_json::to_vec(command)?;
    request.push(b'\n');
    writer.write_all(&request).await?;

    let mut lines = BufReader::new(reader).lines();
    let Some(line) = lines.next_line().await? else {
        bail!("station closed the connection without replying");
    };

    serde_json::from_str(&line).context("station sent an unreadable reply")
}
