//! REPLCONF command implementation.
//!
//! REPLCONF carries four distinct subcommands across the replication
//! lifecycle: `listening-port` and `capa` during the handshake (master
//! side), `GETACK *` sent by the master to solicit an acknowledgement
//! (handled on the replica), and `ACK <offset>` sent back by replicas
//! (handled on the master, feeding the registry that `WAIT` reads).

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::RedisServer,
    state::State,
};

pub struct ReplconfArguments {
    subcommand: String,
    argument: String,
}

impl ReplconfArguments {
    /// Every REPLCONF form carries exactly one subcommand and one argument.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::InvalidReplconfCommand);
        }

        Ok(Self {
            subcommand: arguments[0].to_uppercase(),
            argument: arguments[1].clone(),
        })
    }
}

/// Handles the REPLCONF command.
///
/// * `listening-port <p>` / `capa <x>` - handshake configuration, replies `+OK`
/// * `GETACK *` - replica side; replies a `REPLCONF ACK <offset>` frame
///   carrying the offset committed *before* this request (the caller adds
///   this request's own bytes afterwards)
/// * `ACK <offset>` - master side; records the replica's acknowledged
///   offset and wakes any in-flight `WAIT`, with no reply
pub async fn replconf(
    client_address: &str,
    server: Arc<RwLock<RedisServer>>,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let replconf_arguments = ReplconfArguments::parse(arguments)?;

    match replconf_arguments.subcommand.as_str() {
        "LISTENING-PORT" | "CAPA" => Ok(CommandResult::Response(
            RespValue::SimpleString("OK".to_string()).encode(),
        )),
        "GETACK" => {
            if replconf_arguments.argument != "*" {
                return Err(CommandError::InvalidReplconfCommand);
            }

            let server_guard = server.read().await;

            let ack_frame = RespValue::Array(vec![
                RespValue::BulkString("REPLCONF".to_string()),
                RespValue::BulkString("ACK".to_string()),
                RespValue::BulkString(server_guard.repl_offset.to_string()),
            ]);

            Ok(CommandResult::Response(ack_frame.encode()))
        }
        "ACK" => {
            let acked_offset = replconf_arguments
                .argument
                .parse::<usize>()
                .map_err(|_| CommandError::InvalidReplconfAckOffset)?;

            {
                let mut server_guard = server.write().await;
                server_guard.set_replica_ack(client_address, acked_offset);
            }

            let mut state_guard = state.lock().await;
            state_guard.notify_ack_subscribers();

            Ok(CommandResult::NoResponse)
        }
        _ => Err(CommandError::InvalidReplconfCommand),
    }
}
