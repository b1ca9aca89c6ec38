use crate::rdb::{
    encoding::{parse_length_encoded_integer, parse_string},
    get_slice::get_buffer_slice,
};

const AUX_OPCODE: u8 = 0xFA;
const RESIZE_DB_OPCODE: u8 = 0xFB;
const EXPIRE_TIME_MS_OPCODE: u8 = 0xFC;
const EXPIRE_TIME_SECONDS_OPCODE: u8 = 0xFD;
const SELECT_DB_OPCODE: u8 = 0xFE;
const END_OF_FILE_OPCODE: u8 = 0xFF;

/// One decoded top-level RDB element. Expiry opcodes fold the record they
/// stage into the same response, so the parser never has to carry expiry
/// state between calls.
pub enum OpCodeResponse {
    Aux {
        key: String,
        value: String,
    },
    ResizeDb,
    SelectDb {
        db_index: usize,
    },
    EndOfFile,
    KeyValuePair {
        key: String,
        value: String,
        expire_at_ms: Option<i64>,
    },
}

/// Decodes the element starting at `cursor`, returning it together with the
/// number of bytes consumed.
///
/// Any byte that is not a known opcode begins a string-typed key/value
/// record: the byte is the value-type marker, followed by the key and value
/// strings.
pub fn parse_opcode(bytes: &[u8], cursor: usize) -> tokio::io::Result<(OpCodeResponse, usize)> {
    let mut temp_cursor = cursor;
    let opcode = get_buffer_slice(bytes, temp_cursor, 1)?[0];
    temp_cursor += 1;

    let response = match opcode {
        AUX_OPCODE => {
            let (key, key_bytes_read) = parse_string(bytes, temp_cursor)?;
            temp_cursor += key_bytes_read;
            let (value, value_bytes_read) = parse_string(bytes, temp_cursor)?;
            temp_cursor += value_bytes_read;

            Ok(OpCodeResponse::Aux { key, value })
        }
        RESIZE_DB_OPCODE => {
            let (_, db_size_bytes_read) = parse_length_encoded_integer(bytes, temp_cursor)?;
            temp_cursor += db_size_bytes_read;

            let (_, expiry_size_bytes_read) = parse_length_encoded_integer(bytes, temp_cursor)?;
            temp_cursor += expiry_size_bytes_read;

            Ok(OpCodeResponse::ResizeDb)
        }
        SELECT_DB_OPCODE => {
            let (db_index, db_index_bytes_read) = parse_length_encoded_integer(bytes, temp_cursor)?;
            temp_cursor += db_index_bytes_read;

            Ok(OpCodeResponse::SelectDb { db_index })
        }
        EXPIRE_TIME_SECONDS_OPCODE => {
            let timestamp_bytes: [u8; 4] = get_buffer_slice(bytes, temp_cursor, 4)?
                .try_into()
                .map_err(|_| {
                    tokio::io::Error::new(
                        tokio::io::ErrorKind::UnexpectedEof,
                        "Not enough bytes for u32",
                    )
                })?;
            temp_cursor += 4;

            let expire_at_ms = u32::from_le_bytes(timestamp_bytes) as i64 * 1000;

            let (record, record_bytes_read) = parse_opcode(bytes, temp_cursor)?;
            temp_cursor += record_bytes_read;

            match record {
                OpCodeResponse::KeyValuePair { key, value, .. } => {
                    Ok(OpCodeResponse::KeyValuePair {
                        key,
                        value,
                        expire_at_ms: Some(expire_at_ms),
                    })
                }
                _ => Err(tokio::io::Error::new(
                    tokio::io::ErrorKind::InvalidData,
                    "Expected a key/value record after EXPIRETIME",
                )),
            }
        }
        EXPIRE_TIME_MS_OPCODE => {
            let timestamp_bytes: [u8; 8] = get_buffer_slice(bytes, temp_cursor, 8)?
                .try_into()
                .map_err(|_| {
                    tokio::io::Error::new(
                        tokio::io::ErrorKind::UnexpectedEof,
                        "Not enough bytes for u64",
                    )
                })?;
            temp_cursor += 8;

            let expire_at_ms = u64::from_le_bytes(timestamp_bytes) as i64;

            let (record, record_bytes_read) = parse_opcode(bytes, temp_cursor)?;
            temp_cursor += record_bytes_read;

            match record {
                OpCodeResponse::KeyValuePair { key, value, .. } => {
                    Ok(OpCodeResponse::KeyValuePair {
                        key,
                        value,
                        expire_at_ms: Some(expire_at_ms),
                    })
                }
                _ => Err(tokio::io::Error::new(
                    tokio::io::ErrorKind::InvalidData,
                    "Expected a key/value record after EXPIRETIMEMS",
                )),
            }
        }
        END_OF_FILE_OPCODE => Ok(OpCodeResponse::EndOfFile),
        _ => {
            // The opcode byte is the value-type marker of a string record
            let (key, key_bytes_read) = parse_string(bytes, temp_cursor)?;
            temp_cursor += key_bytes_read;
            let (value, value_bytes_read) = parse_string(bytes, temp_cursor)?;
            temp_cursor += value_bytes_read;

            Ok(OpCodeResponse::KeyValuePair {
                key,
                value,
                expire_at_ms: None,
            })
        }
    }?;

    Ok((response, temp_cursor - cursor))
}

pub struct MagicStringResponse {
    pub number_of_read_bytes: usize,
    pub redis_version: String,
}

/// Checks the `REDIS` magic string and captures the 4-digit version, which
/// is not validated further.
pub fn parse_magic_string(bytes: &[u8]) -> tokio::io::Result<MagicStringResponse> {
    let magic_string = get_buffer_slice(bytes, 0, 5)?;

    if magic_string != b"REDIS" {
        return Err(tokio::io::Error::new(
            tokio::io::ErrorKind::InvalidData,
            "Invalid magic string",
        ));
    }

    let version_bytes = get_buffer_slice(bytes, 5, 4)?;
    let redis_version = String::from_utf8(version_bytes.to_vec())
        .map_err(|e| tokio::io::Error::new(tokio::io::ErrorKind::InvalidData, e.to_string()))?;

    Ok(MagicStringResponse {
        number_of_read_bytes: 9,
        redis_version,
    })
}
