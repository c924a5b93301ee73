use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::{Semaphore, broadcast},
};
use tracing::{debug, error, info, instrument, warn};
use utilities::command_executor::CommandSender;

use crate::{config::TransportConfig, controller::multi_axis::RouterCommand};

const TOO_MANY_CONNECTIONS: &[u8] = b"Too many connections\n";

pub async fn run_server(
    config: &TransportConfig,
    commands: CommandSender<RouterCommand>,
    diagnostics: broadcast::Sender<String>,
) -> Result<()> {
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;

    info!("Listening on {}", listener.local_addr()?);

    serve(listener, commands, diagnostics, config.max_connections).await
}

/// Accepts line clients forever. Each line goes to the router and its replies
/// go back to the same client; diagnostics go to everyone.
pub async fn serve(
    listener: TcpListener,
    commands: CommandSender<RouterCommand>,
    diagnostics: broadcast::Sender<String>,
    max_connections: usize,
) -> Result<()> {
    let permits = Arc::new(Semaphore::new(max_connections));

    loop {
        let (mut socket, peer) = listener
            .accept()
            .await
            .context("Failed to accept connection")?;

        let Ok(permit) = permits.clone().try_acquire_owned() else {
            warn!("Rejecting {}: connection limit reached", peer);
            let _ = socket.write_all(TOO_MANY_CONNECTIONS).await;
            continue;
        };

        let commands = commands.clone();
        let diagnostics = diagnostics.subscribe();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, peer, commands, diagnostics).await {
                error!("Connection {} failed: {:#}", peer, e);
            }
            drop(permit);
        });
    }
}

#[instrument(skip(socket, commands, diagnostics))]
async fn handle_connection(
    socket: TcpStream,
    peer: SocketAddr,
    commands: CommandSender<RouterCommand>,
    mut diagnostics: broadcast::Receiver<String>,
) -> Result<()> {
    info!("Client connected");

    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    let mut diagnostics_open = true;

    loop {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buffer) => {
                if read? == 0 {
                    break;
                }

                // Invalid UTF-8 is replaced, never fatal.
                let line = String::from_utf8_lossy(&buffer).into_owned();
                buffer.clear();

                debug!("<- {}", line.trim_end());
                let replies = commands.send_command(RouterCommand::Line(line)).await?;

                for reply in replies {
                    debug!("-> {}", reply);
                    writer.write_all(reply.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                }
            }
            diagnostic = diagnostics.recv(), if diagnostics_open => {
                match diagnostic {
                    Ok(line) => {
                        writer.write_all(line.as_bytes()).await?;
                        writer.write_all(b"\n").await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Dropped {} diagnostics for slow client", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => diagnostics_open = false,
                }
            }
        }
    }

    info!("Client disconnected");
    Ok(())
}
