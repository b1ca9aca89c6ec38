use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{KeyValueStore, StringEntry},
    resp::RespValue,
};

pub struct IncrArguments {
    key: String,
}

impl IncrArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::InvalidIncrCommand);
        }

        Ok(Self {
            key: arguments[0].clone(),
        })
    }
}

/// Handles the INCR command.
///
/// Increments the integer stored at the key by one. An absent key is
/// initialised to 0 before the increment, so the first INCR yields 1. A
/// value that does not parse as an integer produces
/// `ERR value is not an integer or out of range` and leaves the key
/// untouched.
pub async fn incr(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let incr_arguments = IncrArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;

    let Some(entry) = store_guard.get_mut(&incr_arguments.key) else {
        store_guard.set(
            incr_arguments.key,
            StringEntry::new("1".to_string(), None),
        );

        return Ok(CommandResult::Response(RespValue::Integer(1).encode()));
    };

    let current = entry
        .value
        .parse::<i64>()
        .map_err(|_| CommandError::InvalidIncrValue)?;
    let incremented = current + 1;
    entry.value = incremented.to_string();

    Ok(CommandResult::Response(
        RespValue::Integer(incremented).encode(),
    ))
}
