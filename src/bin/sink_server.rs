use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Largest message read in one go, matching the client's reply buffer
const READ_BUFFER_SIZE: usize = 1024;

/// Receive gesture engine output over TCP, log it and acknowledge each message.
#[derive(Parser, Debug)]
#[command(name = "sink-server")]
#[command(about = "Log and acknowledge messages sent by the gesture engine socket output")]
struct Args {
    #[arg(long, default_value = "127.0.0.1", help = "Address to listen on")]
    host: String,

    #[arg(short, long, default_value_t = 65432, help = "Port to listen on")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Sink server listening on {}", address);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(connection) => connection,
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        continue;
                    }
                };
                info!("Client connected: {}", peer);
                tokio::spawn(async move {
                    match handle_connection(stream).await {
                        Ok(messages) => info!("Client {} disconnected after {} messages", peer, messages),
                        Err(e) => error!("Connection with {} failed: {}", peer, e),
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down sink server");
                break;
            }
        }
    }

    Ok(())
}

/// Log each message and reply with `ACK {n} bytes` until the peer closes.
/// Returns the number of messages handled.
async fn handle_connection<S>(mut stream: S) -> std::io::Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    let mut messages = 0;

    loop {
        let read = stream.read(&mut buffer).await?;
        if read == 0 {
            return Ok(messages);
        }

        let message = String::from_utf8_lossy(&buffer[..read]);
        info!("Received: {}", message);
        debug!("{} bytes", read);

        stream
            .write_all(format!("ACK {} bytes", read).as_bytes())
            .await?;
        messages += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_each_message_is_acknowledged() {
        let (mut client, server) = tokio::io::duplex(READ_BUFFER_SIZE);
        let handler = tokio::spawn(handle_connection(server));

        let mut reply = [0u8; 64];
        client.write_all(b"GESTURE|Right|hand_0|HandOpen|90.0|hold").await.unwrap();
        let n = client.read(&mut reply).await.unwrap();
        assert_eq!(&reply[..n], b"ACK 39 bytes");

        client.write_all(b"TRAIL|hand_0|10|20").await.unwrap();
        let n = client.read(&mut reply).await.unwrap();
        assert_eq!(&reply[..n], b"ACK 18 bytes");

        drop(client);
        assert_eq!(handler.await.unwrap().unwrap(), 2);
    }
}
