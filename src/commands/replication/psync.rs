//! PSYNC command implementation.
//!
//! PSYNC is the last step of the inbound replication handshake: the master
//! announces a full resynchronisation, after which the connection loop
//! ships the snapshot payload and registers the session as a replica.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::RedisServer,
};

pub struct PsyncArguments {
    /// The replication ID the replica knows ("?" requests a full resync)
    master_repl_id: String,
    /// The replica's current offset (-1 requests a full resync)
    offset: i64,
}

impl PsyncArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::InvalidPsyncCommand);
        }

        let master_repl_id = arguments[0].clone();
        let offset = arguments[1]
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidPsyncOffset)?;

        Ok(Self {
            master_repl_id,
            offset,
        })
    }
}

/// Handles the PSYNC command.
///
/// Only full resynchronisation is supported: the reply is
/// `+FULLRESYNC <replid> 0` and the connection loop follows up with the
/// snapshot payload. A replication ID that is neither `?` nor this
/// server's own is rejected.
pub async fn psync(
    server: Arc<RwLock<RedisServer>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let psync_arguments = PsyncArguments::parse(arguments)?;

    if psync_arguments.offset != -1 {
        return Err(CommandError::InvalidPsyncOffset);
    }

    let server_guard = server.read().await;

    let master_repl_id = match psync_arguments.master_repl_id.as_str() {
        "?" => server_guard.repl_id.clone(),
        repl_id => {
            if repl_id != server_guard.repl_id {
                return Err(CommandError::InvalidPsyncReplicationId);
            }

            repl_id.to_string()
        }
    };

    Ok(CommandResult::Response(
        RespValue::SimpleString(format!("FULLRESYNC {} 0", master_repl_id)).encode(),
    ))
}
