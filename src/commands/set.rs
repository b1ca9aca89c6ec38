use std::{sync::Arc, time::Duration};

use jiff::Timestamp;
use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::{KeyValueStore, StringEntry},
    resp::RespValue,
};

pub struct SetArguments {
    key: String,
    value: String,
    expiration: Option<Timestamp>,
}

impl SetArguments {
    /// Parses `SET key value [PX milliseconds]`. The expiration is resolved
    /// to an absolute timestamp at parse time.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 2 && arguments.len() != 4 {
            return Err(CommandError::InvalidSetCommand);
        }

        let mut expiration: Option<Timestamp> = None;

        if arguments.len() == 4 {
            if arguments[2].to_uppercase() != "PX" {
                return Err(CommandError::InvalidSetCommandArgument);
            }

            let expire_after_ms = arguments[3]
                .parse::<u64>()
                .map_err(|_| CommandError::InvalidSetCommandExpiration)?;

            expiration = Some(
                Timestamp::now()
                    .checked_add(Duration::from_millis(expire_after_ms))
                    .map_err(|_| CommandError::InvalidSetCommandExpiration)?,
            );
        }

        Ok(Self {
            key: arguments[0].clone(),
            value: arguments[1].clone(),
            expiration,
        })
    }
}

/// Handles the SET command.
///
/// Stores a key-value pair with an optional `PX` expiration in
/// milliseconds. Replies `+OK`; on a replica the connection loop suppresses
/// the reply when the request was replayed from the master.
pub async fn set(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    store_guard.set(
        set_arguments.key,
        StringEntry::new(set_arguments.value, set_arguments.expiration),
    );

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
