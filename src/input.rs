//! Socket input handling and the outbound replication handshake.
//!
//! Bridges raw TCP reads and parsed RESP values: every connection owns a
//! `BytesMut` that carries partial frames between reads. The replica-side
//! handshake lives here too, since it is the one place where RESP replies
//! and a raw RDB payload share the same byte stream.

use std::sync::Arc;

use bytes::{Buf, BytesMut};
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::RwLock;

use crate::commands::CommandError;
use crate::resp::{RespError, RespValue};
use crate::server::RedisServer;

/// Errors that can occur while reading and parsing commands from network streams.
#[derive(Error, Debug, PartialEq)]
pub enum CommandReadError {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("RESP parse error")]
    RespParseError(#[from] RespError),
    #[error("Command construction error")]
    CommandError(#[from] CommandError),
    #[error("Invalid response from master")]
    InvalidResponseFromMaster,
}

impl CommandReadError {
    pub fn as_string(&self) -> String {
        match self {
            CommandReadError::IoError(msg) => RespValue::Error(format!("ERR {}", msg)).encode(),
            CommandReadError::ConnectionClosed => {
                RespValue::Error("ERR connection closed".to_string()).encode()
            }
            CommandReadError::InvalidUtf8 => {
                RespValue::Error("ERR invalid UTF-8 sequence".to_string()).encode()
            }
            CommandReadError::RespParseError(err) => err.as_string(),
            CommandReadError::CommandError(err) => err.as_string(),
            CommandReadError::InvalidResponseFromMaster => {
                RespValue::Error("ERR invalid response from master".to_string()).encode()
            }
        }
    }
}

/// Reads from the stream until at least one complete RESP value is
/// available, returning every value decoded so far.
///
/// Frames already sitting in `buffer` are served without touching the
/// socket, so bytes left over from a previous read (or from the handshake)
/// are never lost. A zero-length read maps to `ConnectionClosed`.
pub async fn read_and_parse_resp<R>(
    stream: &mut R,
    buffer: &mut BytesMut,
) -> Result<Vec<RespValue>, CommandReadError>
where
    R: AsyncReadExt + Unpin,
{
    loop {
        let parsed_values = RespValue::parse(buffer)?;

        if !parsed_values.is_empty() {
            return Ok(parsed_values);
        }

        let mut chunk = [0u8; 1024];

        let number_of_bytes = stream
            .read(&mut chunk)
            .await
            .map_err(|e| CommandReadError::IoError(e.to_string()))?;

        if number_of_bytes == 0 {
            return Err(CommandReadError::ConnectionClosed);
        }

        buffer.extend_from_slice(&chunk[..number_of_bytes]);
    }
}

/// Performs the outbound replication handshake against the master.
///
/// The sequence is strict; every step validates the designated reply
/// before the next command is sent:
///
/// 1. `PING` → `+PONG`
/// 2. `REPLCONF listening-port <port>` → `+OK`
/// 3. `REPLCONF capa psync2` → `+OK`
/// 4. `PSYNC ? -1` → `+FULLRESYNC <replid> <offset>`
/// 5. The RDB payload (`$<len>` followed by raw bytes, no CRLF) is
///    consumed and discarded
///
/// Returns the read buffer, which may already hold propagated commands the
/// master sent right behind the snapshot; the caller hands it to the
/// steady-state loop.
pub async fn handshake(
    stream: &mut TcpStream,
    server: Arc<RwLock<RedisServer>>,
) -> Result<BytesMut, CommandReadError> {
    let mut buffer = BytesMut::with_capacity(1024);

    let response = send_and_handle_handshake_command(
        &mut buffer,
        stream,
        RespValue::Array(vec![RespValue::BulkString("PING".to_string())]),
    )
    .await?;

    if response != RespValue::SimpleString("PONG".to_string()) {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    {
        let server_guard = server.read().await;
        let response = send_and_handle_handshake_command(
            &mut buffer,
            stream,
            RespValue::Array(vec![
                RespValue::BulkString("REPLCONF".to_string()),
                RespValue::BulkString("listening-port".to_string()),
                RespValue::BulkString(server_guard.port.to_string()),
            ]),
        )
        .await?;

        if response != RespValue::SimpleString("OK".to_string()) {
            return Err(CommandReadError::InvalidResponseFromMaster);
        }
    }

    let response = send_and_handle_handshake_command(
        &mut buffer,
        stream,
        RespValue::Array(vec![
            RespValue::BulkString("REPLCONF".to_string()),
            RespValue::BulkString("capa".to_string()),
            RespValue::BulkString("psync2".to_string()),
        ]),
    )
    .await?;

    if response != RespValue::SimpleString("OK".to_string()) {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    send_command(
        stream,
        RespValue::Array(vec![
            RespValue::BulkString("PSYNC".to_string()),
            RespValue::BulkString("?".to_string()),
            RespValue::BulkString("-1".to_string()),
        ]),
    )
    .await?;

    let fullresync_line = read_line(stream, &mut buffer).await?;

    let Some(fullresync_line) = fullresync_line.strip_prefix('+') else {
        return Err(CommandReadError::InvalidResponseFromMaster);
    };

    let parts: Vec<&str> = fullresync_line.split_whitespace().collect();

    if parts.len() != 3 || parts[0] != "FULLRESYNC" {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    if !is_valid_repl_id(parts[1]) || parts[2].parse::<u64>().is_err() {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    receive_rdb_payload(stream, &mut buffer).await?;

    Ok(buffer)
}

/// Writes one handshake command and decodes exactly one RESP reply.
async fn send_and_handle_handshake_command(
    buffer: &mut BytesMut,
    stream: &mut TcpStream,
    command: RespValue,
) -> Result<RespValue, CommandReadError> {
    send_command(stream, command).await?;

    let resp_values = read_and_parse_resp(stream, buffer).await?;

    if resp_values.len() != 1 {
        return Err(CommandReadError::InvalidResponseFromMaster);
    }

    Ok(resp_values[0].clone())
}

async fn send_command(stream: &mut TcpStream, command: RespValue) -> Result<(), CommandReadError> {
    stream
        .write_all(command.encode().as_bytes())
        .await
        .map_err(|e| CommandReadError::IoError(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| CommandReadError::IoError(e.to_string()))
}

/// Reads one CRLF-terminated line through the buffer, without the
/// terminator. Used around the PSYNC reply, where the next bytes on the
/// wire are a raw payload that must not be consumed by the RESP decoder.
async fn read_line<R>(stream: &mut R, buffer: &mut BytesMut) -> Result<String, CommandReadError>
where
    R: AsyncReadExt + Unpin,
{
    loop {
        if let Some(position) = buffer.windows(2).position(|window| window == b"\r\n") {
            let line = buffer.split_to(position + 2);
            let line = std::str::from_utf8(&line[..line.len() - 2])
                .map_err(|_| CommandReadError::InvalidUtf8)?;

            return Ok(line.to_string());
        }

        let mut chunk = [0u8; 1024];

        let number_of_bytes = stream
            .read(&mut chunk)
            .await
            .map_err(|e| CommandReadError::IoError(e.to_string()))?;

        if number_of_bytes == 0 {
            return Err(CommandReadError::ConnectionClosed);
        }

        buffer.extend_from_slice(&chunk[..number_of_bytes]);
    }
}

/// Consumes the `$<len>\r\n<len bytes>` snapshot payload (no trailing
/// CRLF) and discards it; replicas start from an empty keyspace.
async fn receive_rdb_payload<R>(
    stream: &mut R,
    buffer: &mut BytesMut,
) -> Result<(), CommandReadError>
where
    R: AsyncReadExt + Unpin,
{
    let size_line = read_line(stream, buffer).await?;

    let Some(size) = size_line.strip_prefix('$') else {
        return Err(CommandReadError::InvalidResponseFromMaster);
    };

    let rdb_size = size
        .parse::<usize>()
        .map_err(|_| CommandReadError::InvalidResponseFromMaster)?;

    while buffer.len() < rdb_size {
        let mut chunk = [0u8; 4096];

        let number_of_bytes = stream
            .read(&mut chunk)
            .await
            .map_err(|e| CommandReadError::IoError(e.to_string()))?;

        if number_of_bytes == 0 {
            return Err(CommandReadError::ConnectionClosed);
        }

        buffer.extend_from_slice(&chunk[..number_of_bytes]);
    }

    buffer.advance(rdb_size);

    Ok(())
}

fn is_valid_repl_id(repl_id: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9]{40}$").unwrap();
    re.is_match(repl_id)
}
