//! RESP (Redis Serialization Protocol) value model, decoder and encoder.
//!
//! The decoder works incrementally on a `BytesMut` read buffer: every call
//! consumes as many complete frames as the buffer holds and leaves a
//! trailing partial frame in place for the next socket read. This matters on
//! the replication link, where the master may batch several commands into
//! one TCP segment or split a single command across two.

use bytes::{Buf, BytesMut};
use thiserror::Error;

/// Errors produced while decoding RESP frames.
#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("unknown RESP type")]
    UnknownRespType,
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("invalid bulk string")]
    InvalidBulkString,
    #[error("bulk string length mismatch")]
    LengthMismatch,
    #[error("invalid array")]
    InvalidArray,
}

impl RespError {
    /// Converts the error into a RESP-encoded error string suitable for client responses.
    pub fn as_string(&self) -> String {
        RespValue::Error(format!("ERR Protocol error: {}", self)).encode()
    }
}

/// A single RESP value as exchanged between client and server.
///
/// Requests at the top level are always `Array`s of `BulkString`s; replies
/// use the full set of variants.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    NullBulkString,
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Decodes every complete RESP value available in `buffer`.
    ///
    /// Consumed bytes are drained from the front of the buffer; a trailing
    /// incomplete frame is left untouched so that the caller can append more
    /// data and retry. Encoding a decoded request with [`RespValue::encode`]
    /// reproduces the consumed bytes, which is how the replication loop
    /// accounts committed offsets.
    pub fn parse(buffer: &mut BytesMut) -> Result<Vec<RespValue>, RespError> {
        let mut values = Vec::new();

        loop {
            let mut cursor = 0usize;

            match Self::decode(&buffer[..], &mut cursor)? {
                Some(value) => {
                    buffer.advance(cursor);
                    values.push(value);
                }
                None => break,
            }
        }

        Ok(values)
    }

    /// Decodes one value starting at `cursor`, advancing it past the frame.
    ///
    /// Returns `Ok(None)` when the buffer ends mid-frame.
    fn decode(bytes: &[u8], cursor: &mut usize) -> Result<Option<RespValue>, RespError> {
        let Some(line) = Self::read_line(bytes, cursor)? else {
            return Ok(None);
        };

        let Some(type_prefix) = line.chars().next() else {
            return Err(RespError::UnknownRespType);
        };
        let data = &line[1..];

        match type_prefix {
            '+' => Ok(Some(RespValue::SimpleString(data.to_string()))),
            '-' => Ok(Some(RespValue::Error(data.to_string()))),
            ':' => {
                let value = data
                    .parse::<i64>()
                    .map_err(|_| RespError::FailedToParseInteger)?;

                Ok(Some(RespValue::Integer(value)))
            }
            '$' => {
                if data == "-1" {
                    return Ok(Some(RespValue::NullBulkString));
                }

                let length = data
                    .parse::<usize>()
                    .map_err(|_| RespError::InvalidBulkString)?;

                // Payload bytes plus the trailing CRLF must be present in full
                if bytes.len() < *cursor + length + 2 {
                    return Ok(None);
                }

                let payload = &bytes[*cursor..*cursor + length];

                if &bytes[*cursor + length..*cursor + length + 2] != b"\r\n" {
                    return Err(RespError::LengthMismatch);
                }

                let content = std::str::from_utf8(payload).map_err(|_| RespError::InvalidUtf8)?;
                *cursor += length + 2;

                Ok(Some(RespValue::BulkString(content.to_string())))
            }
            '*' => {
                let number_of_elements =
                    data.parse::<usize>().map_err(|_| RespError::InvalidArray)?;

                let mut elements: Vec<RespValue> = Vec::with_capacity(number_of_elements);

                while elements.len() < number_of_elements {
                    match Self::decode(bytes, cursor)? {
                        Some(element) => elements.push(element),
                        None => return Ok(None),
                    }
                }

                Ok(Some(RespValue::Array(elements)))
            }
            _ => Err(RespError::UnknownRespType),
        }
    }

    /// Reads one CRLF-terminated header line, without the terminator.
    fn read_line<'a>(bytes: &'a [u8], cursor: &mut usize) -> Result<Option<&'a str>, RespError> {
        let search_space = &bytes[*cursor..];

        let Some(position) = search_space.windows(2).position(|window| window == b"\r\n") else {
            return Ok(None);
        };

        let line =
            std::str::from_utf8(&search_space[..position]).map_err(|_| RespError::InvalidUtf8)?;
        *cursor += position + 2;

        Ok(Some(line))
    }

    /// Encodes the value into its RESP wire representation.
    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(content) => format!("+{}\r\n", content),
            RespValue::Error(content) => format!("-{}\r\n", content),
            RespValue::Integer(value) => format!(":{}\r\n", value),
            RespValue::BulkString(content) => format!("${}\r\n{}\r\n", content.len(), content),
            RespValue::NullBulkString => "$-1\r\n".to_string(),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len());

                for element in elements {
                    encoded.push_str(&element.encode());
                }

                encoded
            }
        }
    }
}
