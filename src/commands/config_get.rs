use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::RedisServer,
};

pub struct ConfigGetArguments {
    pub parameters: Vec<String>,
}

impl ConfigGetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::InvalidConfigGetCommand);
        }

        Ok(ConfigGetArguments {
            parameters: arguments,
        })
    }
}

/// Handles `CONFIG GET`. Only the RDB snapshot parameters (`dir`,
/// `dbfilename`) are exposed; each requested parameter adds a name/value
/// pair to the reply array.
pub async fn config_get(
    server: Arc<RwLock<RedisServer>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let config_get_arguments = ConfigGetArguments::parse(arguments)?;
    let mut response = Vec::new();

    let server_guard = server.read().await;

    for parameter in config_get_arguments.parameters {
        match parameter.as_str() {
            "dir" => {
                response.push(RespValue::BulkString("dir".to_string()));
                response.push(RespValue::BulkString(server_guard.rdb_directory.clone()));
            }
            "dbfilename" => {
                response.push(RespValue::BulkString("dbfilename".to_string()));
                response.push(RespValue::BulkString(server_guard.rdb_filename.clone()));
            }
            _ => return Err(CommandError::InvalidConfigGetCommandArgument),
        }
    }

    Ok(CommandResult::Response(RespValue::Array(response).encode()))
}
