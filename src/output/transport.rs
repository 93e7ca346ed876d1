//! Reconnecting TCP client used by the output worker.
//!
//! All socket access goes through one lock, so sends are serialized. A failed
//! exchange drops the connection and retries after a fixed delay, up to
//! `max_reconnect_attempts` times; after that `send` gives up and returns
//! `None`. Nothing is buffered for later delivery.

use crate::config::OutputConfig;
use crate::error::TransportError;
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Largest reply read back from the server per message
const REPLY_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportStatus {
    pub enabled: bool,
    pub connected: bool,
    pub reconnect_attempts: u32,
}

pub trait Transport: Send + Sync {
    fn connect(&self) -> bool;

    /// Deliver one message and return the server's reply
    fn send(&self, message: &str) -> Option<String>;

    fn disconnect(&self);

    fn status(&self) -> TransportStatus;
}

#[derive(Debug, Clone)]
pub struct SocketSettings {
    pub host: String,
    pub port: u16,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

impl SocketSettings {
    pub fn from_config(config: &OutputConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            max_reconnect_attempts: config.max_reconnect_attempts,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Default)]
struct Connection {
    stream: Option<TcpStream>,
    reconnect_attempts: u32,
}

#[derive(Debug)]
pub struct SocketClient {
    settings: SocketSettings,
    enabled: bool,
    connection: Mutex<Connection>,
}

impl SocketClient {
    pub fn new(settings: SocketSettings, enabled: bool) -> Self {
        Self {
            settings,
            enabled,
            connection: Mutex::new(Connection::default()),
        }
    }

    pub fn settings(&self) -> &SocketSettings {
        &self.settings
    }

    fn open(&self, connection: &mut Connection) -> Result<(), TransportError> {
        if !self.enabled {
            return Err(TransportError::Disabled);
        }
        if connection.stream.is_some() {
            return Ok(());
        }

        let address = self.settings.address();
        let connect_failed = |err: io::Error| TransportError::ConnectFailed {
            address: address.clone(),
            details: err.to_string(),
        };

        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "address did not resolve");
        for socket_addr in (self.settings.host.as_str(), self.settings.port)
            .to_socket_addrs()
            .map_err(connect_failed)?
        {
            match TcpStream::connect_timeout(&socket_addr, self.settings.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.settings.connect_timeout))?;
                    stream.set_write_timeout(Some(self.settings.connect_timeout))?;
                    stream.set_nodelay(true)?;
                    connection.stream = Some(stream);
                    connection.reconnect_attempts = 0;
                    debug!("Connected to {}", address);
                    return Ok(());
                }
                Err(err) => last_error = err,
            }
        }

        Err(connect_failed(last_error))
    }

    /// Retry with a fixed delay until connected or out of attempts. The
    /// attempt counter only resets on a successful connection.
    fn reconnect(&self, connection: &mut Connection) -> Result<(), TransportError> {
        loop {
            if connection.reconnect_attempts >= self.settings.max_reconnect_attempts {
                return Err(TransportError::ReconnectExhausted {
                    attempts: connection.reconnect_attempts,
                });
            }

            connection.reconnect_attempts += 1;
            debug!(
                "Reconnecting to {} ({}/{})",
                self.settings.address(),
                connection.reconnect_attempts,
                self.settings.max_reconnect_attempts
            );
            std::thread::sleep(self.settings.reconnect_delay);
            match self.open(connection) {
                Ok(()) => return Ok(()),
                Err(TransportError::Disabled) => return Err(TransportError::Disabled),
                Err(err) => debug!("Reconnect failed: {}", err),
            }
        }
    }

    fn exchange(stream: &mut TcpStream, message: &str) -> io::Result<String> {
        stream.write_all(message.as_bytes())?;
        let mut reply = [0u8; REPLY_BUFFER_SIZE];
        let read = stream.read(&mut reply)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            ));
        }
        Ok(String::from_utf8_lossy(&reply[..read]).into_owned())
    }
}

impl Transport for SocketClient {
    fn connect(&self) -> bool {
        let mut connection = self.connection.lock();
        match self.open(&mut connection) {
            Ok(()) => {
                info!("Socket output connected to {}", self.settings.address());
                true
            }
            Err(TransportError::Disabled) => false,
            Err(err) => {
                warn!("Socket output unavailable: {}", err);
                false
            }
        }
    }

    fn send(&self, message: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let mut connection = self.connection.lock();
        let mut failed_exchanges = 0;
        loop {
            if connection.stream.is_none() {
                if let Err(err) = self.reconnect(&mut connection) {
                    warn!("Dropping message: {}", err);
                    return None;
                }
            }

            let stream = connection.stream.as_mut()?;
            match Self::exchange(stream, message) {
                Ok(reply) => {
                    debug!("Server replied: {}", reply);
                    return Some(reply);
                }
                Err(err) => {
                    debug!("Send to {} failed: {}", self.settings.address(), err);
                    connection.stream = None;
                    failed_exchanges += 1;
                    if failed_exchanges > self.settings.max_reconnect_attempts {
                        warn!("Dropping message after {} failed sends", failed_exchanges);
                        return None;
                    }
                }
            }
        }
    }

    fn disconnect(&self) {
        let mut connection = self.connection.lock();
        if let Some(stream) = connection.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!("Socket output disconnected from {}", self.settings.address());
        }
    }

    fn status(&self) -> TransportStatus {
        let connection = self.connection.lock();
        TransportStatus {
            enabled: self.enabled,
            connected: connection.stream.is_some(),
            reconnect_attempts: connection.reconnect_attempts,
        }
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        if let Some(stream) = self.connection.get_mut().stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
