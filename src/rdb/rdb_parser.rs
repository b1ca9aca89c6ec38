use std::collections::HashMap;

use jiff::Timestamp;

use crate::{
    key_value_store::StringEntry,
    rdb::opcode::{OpCodeResponse, parse_magic_string, parse_opcode},
};

/// Decoded contents of an RDB snapshot, restricted to the string keyspace.
///
/// Records whose expiration already lies in the past at load time are
/// dropped, so warming the keyspace never resurrects dead keys.
#[derive(Debug)]
pub struct RdbParser {
    pub redis_version: String,
    pub aux_fields: HashMap<String, String>,
    pub db_index: Option<usize>,
    pub entries: HashMap<String, StringEntry>,
}

impl RdbParser {
    /// Decodes a complete RDB file image. At most one database section is
    /// consumed; a second SELECTDB ends the parse. Any decode error aborts
    /// loading and is reported to the caller.
    pub fn parse(buffer: &[u8]) -> tokio::io::Result<Self> {
        let magic_string_response = parse_magic_string(buffer)?;
        let mut cursor = magic_string_response.number_of_read_bytes;

        let mut parser = RdbParser {
            redis_version: magic_string_response.redis_version,
            aux_fields: HashMap::new(),
            db_index: None,
            entries: HashMap::new(),
        };

        let load_time_ms = Timestamp::now().as_millisecond();

        while cursor < buffer.len() {
            let (response, bytes_read) = parse_opcode(buffer, cursor)?;
            cursor += bytes_read;

            match response {
                OpCodeResponse::Aux { key, value } => {
                    parser.aux_fields.insert(key, value);
                }
                OpCodeResponse::ResizeDb => (),
                OpCodeResponse::SelectDb { db_index } => {
                    if parser.db_index.is_some() {
                        break;
                    }

                    parser.db_index = Some(db_index);
                }
                OpCodeResponse::EndOfFile => break,
                OpCodeResponse::KeyValuePair {
                    key,
                    value,
                    expire_at_ms,
                } => {
                    let expiration = match expire_at_ms {
                        Some(expire_at_ms) => {
                            if expire_at_ms <= load_time_ms {
                                continue;
                            }

                            Some(Timestamp::from_millisecond(expire_at_ms).map_err(|e| {
                                tokio::io::Error::new(
                                    tokio::io::ErrorKind::InvalidData,
                                    format!("Invalid expiration timestamp: {}", e),
                                )
                            })?)
                        }
                        None => None,
                    };

                    parser.entries.insert(key, StringEntry::new(value, expiration));
                }
            }
        }

        Ok(parser)
    }
}
