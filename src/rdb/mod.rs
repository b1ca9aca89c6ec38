mod encoding;
mod get_slice;
mod opcode;
mod rdb_file_operations;
mod rdb_parser;

pub use rdb_file_operations::{EMPTY_RDB, parse_rdb_file, send_full_resync_payload};
pub use rdb_parser::RdbParser;
