use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct KeysArguments;

impl KeysArguments {
    /// Only the `*` pattern is supported.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 1 || arguments[0] != "*" {
            return Err(CommandError::InvalidKeysCommand);
        }

        Ok(Self)
    }
}

/// Handles `KEYS *`: enumerates every live string key, in unspecified
/// order. Stream keys are not included.
pub async fn keys(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    KeysArguments::parse(arguments)?;

    let store_guard = store.lock().await;

    let response = store_guard
        .string_keys()
        .into_iter()
        .map(RespValue::BulkString)
        .collect::<Vec<RespValue>>();

    Ok(CommandResult::Response(RespValue::Array(response).encode()))
}
