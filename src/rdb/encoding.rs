//! RDB length and string encodings.
//!
//! Lengths are prefixed by a discriminator in the top two bits of the first
//! byte: `00` keeps the length in the low 6 bits, `01` extends it with one
//! more byte (14 bits total), `10` reads a 4-byte big-endian length, and
//! `11` marks a special format where the low 6 bits select an 8/16/32-bit
//! little-endian integer rendered as a decimal string, or an LZF-compressed
//! string (rejected).

use crate::rdb::get_slice::get_buffer_slice;

#[derive(Debug)]
enum ValueEncoding {
    String(usize),
    Int8,
    Int16,
    Int32,
    LzfCompressedString,
}

fn parse_length_encoding(bytes: &[u8], cursor: usize) -> tokio::io::Result<(ValueEncoding, usize)> {
    let mut temp_cursor = cursor;
    let first_byte = get_buffer_slice(bytes, temp_cursor, 1)?[0];
    temp_cursor += 1;

    let discriminator = first_byte >> 6;

    let value_encoding = match discriminator {
        0b00 => Ok(ValueEncoding::String((first_byte & 0b0011_1111) as usize)),
        0b01 => {
            let second_byte = get_buffer_slice(bytes, temp_cursor, 1)?[0];
            temp_cursor += 1;

            let length = (((first_byte & 0b0011_1111) as usize) << 8) | second_byte as usize;

            Ok(ValueEncoding::String(length))
        }
        0b10 => {
            let length_bytes: [u8; 4] = get_buffer_slice(bytes, temp_cursor, 4)?
                .try_into()
                .map_err(|_| {
                    tokio::io::Error::new(
                        tokio::io::ErrorKind::UnexpectedEof,
                        "Not enough bytes for u32",
                    )
                })?;
            temp_cursor += 4;

            Ok(ValueEncoding::String(u32::from_be_bytes(length_bytes) as usize))
        }
        _ => match first_byte & 0b0011_1111 {
            0 => Ok(ValueEncoding::Int8),
            1 => Ok(ValueEncoding::Int16),
            2 => Ok(ValueEncoding::Int32),
            3 => Ok(ValueEncoding::LzfCompressedString),
            _ => Err(tokio::io::Error::new(
                tokio::io::ErrorKind::InvalidData,
                "Invalid length encoding",
            )),
        },
    }?;

    Ok((value_encoding, temp_cursor - cursor))
}

/// Parses a length-encoded integer (DB index, hash table sizes). Rejects
/// the special integer-string formats, which are only valid for values.
pub fn parse_length_encoded_integer(
    bytes: &[u8],
    cursor: usize,
) -> tokio::io::Result<(usize, usize)> {
    let (value_encoding, bytes_read) = parse_length_encoding(bytes, cursor)?;

    match value_encoding {
        ValueEncoding::String(value) => Ok((value, bytes_read)),
        _ => Err(tokio::io::Error::new(
            tokio::io::ErrorKind::InvalidData,
            "Value should be a length encoded integer",
        )),
    }
}

/// Parses an RDB string: a length followed by that many raw bytes, or one
/// of the integer special formats rendered as a decimal string.
pub fn parse_string(bytes: &[u8], cursor: usize) -> tokio::io::Result<(String, usize)> {
    let mut temp_cursor = cursor;
    let (value_encoding, length_bytes_read) = parse_length_encoding(bytes, temp_cursor)?;
    temp_cursor += length_bytes_read;

    let value = match value_encoding {
        ValueEncoding::String(length) => {
            let payload = get_buffer_slice(bytes, temp_cursor, length)?;
            temp_cursor += length;

            String::from_utf8(payload.to_vec()).map_err(|_| {
                tokio::io::Error::new(tokio::io::ErrorKind::InvalidData, "Invalid UTF-8")
            })
        }
        ValueEncoding::Int8 => {
            let byte = get_buffer_slice(bytes, temp_cursor, 1)?[0];
            temp_cursor += 1;

            Ok((byte as i8).to_string())
        }
        ValueEncoding::Int16 => {
            let int_bytes: [u8; 2] = get_buffer_slice(bytes, temp_cursor, 2)?
                .try_into()
                .map_err(|_| {
                    tokio::io::Error::new(
                        tokio::io::ErrorKind::UnexpectedEof,
                        "Not enough bytes for i16",
                    )
                })?;
            temp_cursor += 2;

            Ok(i16::from_le_bytes(int_bytes).to_string())
        }
        ValueEncoding::Int32 => {
            let int_bytes: [u8; 4] = get_buffer_slice(bytes, temp_cursor, 4)?
                .try_into()
                .map_err(|_| {
                    tokio::io::Error::new(
                        tokio::io::ErrorKind::UnexpectedEof,
                        "Not enough bytes for i32",
                    )
                })?;
            temp_cursor += 4;

            Ok(i32::from_le_bytes(int_bytes).to_string())
        }
        ValueEncoding::LzfCompressedString => Err(tokio::io::Error::new(
            tokio::io::ErrorKind::Unsupported,
            "LZF-compressed strings are not supported",
        )),
    }?;

    Ok((value, temp_cursor - cursor))
}
