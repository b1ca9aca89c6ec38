use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::RedisServer,
};

pub struct InfoArguments {
    section: String,
}

impl InfoArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::InvalidInfoCommand);
        }

        Ok(Self {
            section: arguments[0].to_lowercase(),
        })
    }
}

/// Handles `INFO replication`: a bulk string with the role, replication ID
/// and current replication offset.
pub async fn info(
    server: Arc<RwLock<RedisServer>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let info_arguments = InfoArguments::parse(arguments)?;

    if info_arguments.section != "replication" {
        return Err(CommandError::InvalidInfoSection);
    }

    let server_guard = server.read().await;

    let section = format!(
        "# Replication\r\nrole:{}\r\nmaster_replid:{}\r\nmaster_repl_offset:{}\r\n",
        server_guard.role.as_string(),
        server_guard.repl_id,
        server_guard.repl_offset
    );

    Ok(CommandResult::Response(
        RespValue::BulkString(section).encode(),
    ))
}
