//! Local request transport: newline-delimited JSON over loopback TCP.
//!
//! One request line in, exactly one response line out. Connections are
//! independent tasks; the daemon applies no queueing or admission control
//! beyond what the listener provides.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

use crate::dispatch::Dispatcher;

pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                log::debug!("connection from {peer}");
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, dispatcher).await {
                        log::debug!("connection from {peer} closed: {e}");
                    }
                });
            }
            Err(e) => {
                log::warn!("accept failed: {e}");
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request_id = Uuid::new_v4();
        log::debug!("request {request_id}: {} bytes", line.len());
        let reply = dispatcher.handle(line.as_bytes()).await;
        log::debug!("request {request_id}: replying {} bytes", reply.len());
        writer.write_all(&reply).await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}
