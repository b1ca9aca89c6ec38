use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct TypeArguments {
    key: String,
}

impl TypeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::InvalidTypeCommand);
        }

        Ok(Self {
            key: arguments[0].clone(),
        })
    }
}

/// Handles the TYPE command. Streams are consulted before strings, so a key
/// present in both maps reports `stream`.
pub async fn type_command(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let type_arguments = TypeArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;

    let key_type = if store_guard.contains_stream(&type_arguments.key) {
        "stream"
    } else if store_guard.get(&type_arguments.key).is_some() {
        "string"
    } else {
        "none"
    };

    Ok(CommandResult::Response(
        RespValue::SimpleString(key_type.to_string()).encode(),
    ))
}
