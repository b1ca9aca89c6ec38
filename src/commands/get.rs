use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct GetArguments {
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::InvalidGetCommand);
        }

        Ok(Self {
            key: arguments[0].clone(),
        })
    }
}

/// Handles the GET command.
///
/// Expiry is evaluated lazily here: looking up a key whose expiration has
/// elapsed removes the entry and replies with a null bulk string, exactly as
/// if the key had never existed.
pub async fn get(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let get_arguments = GetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;

    match store_guard.get(&get_arguments.key) {
        Some(entry) => Ok(CommandResult::Response(
            RespValue::BulkString(entry.value.clone()).encode(),
        )),
        None => Ok(CommandResult::Response(RespValue::NullBulkString.encode())),
    }
}
