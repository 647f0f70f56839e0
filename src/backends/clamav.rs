//! ClamAV scanning backend.
//!
//! Talks to clamd over TCP, or over a Unix socket on unix platforms, using
//! the null-terminated `z` command variants.
//!
//! # Protocol
//!
//! `zINSTREAM\0`, then the payload as frames of a 4-byte big-endian length
//! followed by that many bytes, then a zero-length frame. clamd answers
//! `stream: OK` or `stream: <signature> FOUND` and closes the connection.
//!
//! Every step runs under a deadline. Nothing here ever yields `Infected`
//! for a transport problem: failures become `ScanOutcome::Skipped`.

use crate::core::{ScanError, ScanOutcome, Scanner};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

const ENGINE: &str = "clamav";

/// Upper bound on a daemon reply; real replies are well under 1 KiB.
const MAX_RESPONSE_LEN: u64 = 4096;

/// Default TCP address of clamd.
pub const DEFAULT_TCP_ADDRESS: &str = "127.0.0.1:3310";

/// Default INSTREAM frame payload size.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// ClamAV scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClamAvConfig {
    /// TCP `host:port` of clamd.
    pub tcp_address: String,

    /// Unix socket of clamd. Takes precedence over `tcp_address` on unix.
    pub socket_path: Option<PathBuf>,

    /// Deadline for establishing the connection.
    #[serde(with = "crate::core::duration_ms", rename = "connect_timeout_ms")]
    pub connect_timeout: Duration,

    /// Deadline for sending the payload, and separately for reading the reply.
    #[serde(with = "crate::core::duration_ms", rename = "io_timeout_ms")]
    pub io_timeout: Duration,

    /// Payload bytes per INSTREAM frame.
    pub chunk_size: usize,
}

impl Default for ClamAvConfig {
    fn default() -> Self {
        Self {
            tcp_address: DEFAULT_TCP_ADDRESS.to_string(),
            socket_path: None,
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(30),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ClamAvConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a TCP connection.
    pub fn with_tcp(mut self, address: impl Into<String>) -> Self {
        self.tcp_address = address.into();
        self.socket_path = None;
        self
    }

    /// Uses a Unix socket.
    pub fn with_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Sets the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the send/read timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sets the INSTREAM frame size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }
}

trait DaemonStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> DaemonStream for T {}

/// ClamAV scanner implementation.
///
/// # Example
///
/// ```rust,ignore
/// use uploadgate::backends::clamav::{ClamAvConfig, ClamAvScanner};
///
/// let config = ClamAvConfig::new().with_tcp("10.0.0.5:3310");
/// let scanner = ClamAvScanner::new(config)?;
/// let outcome = scanner.scan(&bytes).await;
/// ```
#[derive(Debug)]
pub struct ClamAvScanner {
    config: ClamAvConfig,
    found: Regex,
}

impl ClamAvScanner {
    /// Creates a new ClamAV scanner with the given configuration.
    pub fn new(config: ClamAvConfig) -> Result<Self, ScanError> {
        if config.chunk_size == 0 {
            return Err(ScanError::configuration("chunk_size must be positive"));
        }
        if config.socket_path.is_none() && config.tcp_address.trim().is_empty() {
            return Err(ScanError::configuration(
                "either socket_path or tcp_address must be specified",
            ));
        }

        let found = Regex::new(r"stream: (.+) FOUND")
            .map_err(|e| ScanError::configuration(e.to_string()))?;

        Ok(Self { config, found })
    }

    /// Creates a ClamAV scanner with default configuration.
    pub fn with_defaults() -> Result<Self, ScanError> {
        Self::new(ClamAvConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClamAvConfig {
        &self.config
    }

    async fn connect(&self) -> Result<Box<dyn DaemonStream>, ScanError> {
        #[cfg(unix)]
        {
            if let Some(ref socket_path) = self.config.socket_path {
                let stream = within(
                    self.config.connect_timeout,
                    "connect",
                    tokio::net::UnixStream::connect(socket_path),
                )
                .await?;
                return Ok(Box::new(stream));
            }
        }

        let stream = within(
            self.config.connect_timeout,
            "connect",
            tokio::net::TcpStream::connect(self.config.tcp_address.as_str()),
        )
        .await?;
        // Frames are small and written back to back.
        let _ = stream.set_nodelay(true);
        Ok(Box::new(stream))
    }

    /// Sends a single command and returns the trimmed reply.
    async fn command(&self, command: &[u8]) -> Result<String, ScanError> {
        let mut stream = self.connect().await?;
        within(self.config.io_timeout, "send", async {
            stream.write_all(command).await?;
            stream.flush().await
        })
        .await?;
        self.read_reply(&mut stream).await
    }

    async fn instream(&self, data: &[u8]) -> Result<String, ScanError> {
        let mut stream = self.connect().await?;
        within(
            self.config.io_timeout,
            "send",
            write_instream(&mut stream, data, self.config.chunk_size),
        )
        .await?;
        self.read_reply(&mut stream).await
    }

    async fn read_reply<R: AsyncRead + Unpin>(&self, stream: &mut R) -> Result<String, ScanError> {
        let mut reply = Vec::new();
        within(
            self.config.io_timeout,
            "read",
            stream.take(MAX_RESPONSE_LEN).read_to_end(&mut reply),
        )
        .await?;

        let text = String::from_utf8_lossy(&reply);
        Ok(trim_reply(&text).to_string())
    }

    /// Interprets an INSTREAM reply.
    ///
    /// FOUND is matched first so that a signature name containing "OK" is
    /// never read as clean.
    fn parse_response(&self, response: &str) -> Result<ScanOutcome, ScanError> {
        if let Some(captures) = self.found.captures(response) {
            let name = captures.get(1).map_or("", |m| m.as_str().trim());
            if !name.is_empty() {
                return Ok(ScanOutcome::infected(name));
            }
        }

        if response.contains("OK") {
            return Ok(ScanOutcome::Clean);
        }

        Err(ScanError::UnrecognizedResponse {
            engine: ENGINE.to_string(),
            raw: response.to_string(),
        })
    }

    async fn try_scan(&self, data: &[u8]) -> Result<ScanOutcome, ScanError> {
        let response = self.instream(data).await?;
        debug!(engine = ENGINE, response = %response, "clamd reply");
        self.parse_response(&response)
    }
}

async fn write_instream<W>(stream: &mut W, data: &[u8], chunk_size: usize) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(b"zINSTREAM\0").await?;
    for chunk in data.chunks(chunk_size) {
        // chunk_size is a usize but clamd frames carry a u32 length.
        let len = u32::try_from(chunk.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "frame exceeds u32::MAX")
        })?;
        stream.write_all(&len.to_be_bytes()).await?;
        stream.write_all(chunk).await?;
    }
    stream.write_all(&0u32.to_be_bytes()).await?;
    stream.flush().await
}

fn trim_reply(reply: &str) -> &str {
    reply.trim_end_matches(|c: char| matches!(c, '\0' | '\r' | '\n' | ' '))
}

/// Runs an I/O step under a deadline, mapping both failure modes to `ScanError`.
async fn within<T, F>(limit: Duration, operation: &'static str, step: F) -> Result<T, ScanError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(limit, step).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ScanError::connection_failed(
            ENGINE,
            format!("{operation}: {e}"),
        )),
        Err(_) => Err(ScanError::timeout(ENGINE, operation, limit)),
    }
}

#[async_trait]
impl Scanner for ClamAvScanner {
    fn name(&self) -> &str {
        ENGINE
    }

    async fn scan(&self, data: &[u8]) -> ScanOutcome {
        match self.try_scan(data).await {
            Ok(outcome) => outcome,
            Err(error) => {
                let reason = error.skip_reason();
                warn!(
                    engine = ENGINE,
                    error = %error,
                    reason = %reason,
                    "antivirus scan produced no verdict"
                );
                ScanOutcome::skipped(reason)
            }
        }
    }

    async fn health_check(&self) -> Result<(), ScanError> {
        let reply = self.command(b"zPING\0").await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(ScanError::engine_unavailable(
                ENGINE,
                "unexpected reply to PING",
            ))
        }
    }

    async fn signature_version(&self) -> Option<String> {
        match self.command(b"zVERSION\0").await {
            Ok(version) if !version.is_empty() => Some(version),
            Ok(_) => None,
            Err(error) => {
                debug!(engine = ENGINE, error = %error, "version query failed");
                None
            }
        }
    }
}
