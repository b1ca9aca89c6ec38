use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, RwLock};

use crate::key_value_store::KeyValueStore;
use crate::rdb::RdbParser;
use crate::server::{RedisServer, Replica};

/// The empty snapshot a master ships during a full resync. Fixed byte
/// sequence: header, aux fields and EOF of an RDB with no keys.
pub const EMPTY_RDB: [u8; 88] = [
    0x52, 0x45, 0x44, 0x49, 0x53, 0x30, 0x30, 0x31, 0x31, 0xfa, 0x09, 0x72, 0x65, 0x64, 0x69,
    0x73, 0x2d, 0x76, 0x65, 0x72, 0x05, 0x37, 0x2e, 0x32, 0x2e, 0x30, 0xfa, 0x0a, 0x72, 0x65,
    0x64, 0x69, 0x73, 0x2d, 0x62, 0x69, 0x74, 0x73, 0xc0, 0x40, 0xfa, 0x05, 0x63, 0x74, 0x69,
    0x6d, 0x65, 0xc2, 0x6d, 0x08, 0xbc, 0x65, 0xfa, 0x08, 0x75, 0x73, 0x65, 0x64, 0x2d, 0x6d,
    0x65, 0x6d, 0xc2, 0xb0, 0xc4, 0x10, 0x00, 0xfa, 0x08, 0x61, 0x6f, 0x66, 0x2d, 0x62, 0x61,
    0x73, 0x65, 0xc0, 0x00, 0xff, 0xf0, 0x6e, 0x3b, 0xfe, 0xc0, 0xff, 0x5a, 0xa2,
];

/// Ships the full-resync snapshot to a freshly synchronised replica and
/// registers it in the replica registry.
///
/// The payload is framed as `$<len>\r\n<bytes>` with no trailing CRLF, the
/// one place the protocol carries a raw binary blob. Registration happens
/// only after the payload is fully written, so propagation can never
/// interleave with the snapshot.
pub async fn send_full_resync_payload(
    client_address: &str,
    writer: Arc<RwLock<OwnedWriteHalf>>,
    server: Arc<RwLock<RedisServer>>,
) -> tokio::io::Result<()> {
    let header = format!("${}\r\n", EMPTY_RDB.len());

    {
        let mut writer_guard = writer.write().await;
        writer_guard.write_all(header.as_bytes()).await?;
        writer_guard.write_all(&EMPTY_RDB).await?;
        writer_guard.flush().await?;
    }

    let mut server_guard = server.write().await;
    server_guard.insert_replica(
        client_address.to_string(),
        Replica {
            writer,
            acked_offset: 0,
        },
    );

    Ok(())
}

/// Warms the keyspace from `<dir>/<dbfilename>` at startup.
///
/// Errors (missing file, malformed snapshot) are returned to the caller,
/// which logs them and keeps serving an empty keyspace.
pub async fn parse_rdb_file(
    server: Arc<RwLock<RedisServer>>,
    store: Arc<Mutex<KeyValueStore>>,
) -> tokio::io::Result<()> {
    let file_path = {
        let server_guard = server.read().await;

        Path::new(&server_guard.rdb_directory).join(&server_guard.rdb_filename)
    };

    if !file_path.exists() {
        return Err(tokio::io::Error::new(
            tokio::io::ErrorKind::NotFound,
            format!("RDB file not found: {}", file_path.display()),
        ));
    }

    let contents = tokio::fs::read(&file_path).await?;
    let parser = RdbParser::parse(&contents)?;

    let mut store_guard = store.lock().await;
    store_guard.extend_strings(parser.entries);

    Ok(())
}
