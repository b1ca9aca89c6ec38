use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{
        command_error::CommandError, command_handler::CommandResult,
        stream_utils::resolve_xadd_stream_id,
    },
    key_value_store::{KeyValueStore, StreamEntry},
    resp::RespValue,
    state::State,
};

pub struct XaddArguments {
    key: String,
    stream_id: String,
    fields: Vec<(String, String)>,
}

impl XaddArguments {
    /// Parses `XADD key id field value [field value ...]`; at least one
    /// complete field/value pair is required.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() < 4 || (arguments.len() - 2) % 2 != 0 {
            return Err(CommandError::InvalidXAddCommand);
        }

        let mut fields = Vec::with_capacity((arguments.len() - 2) / 2);

        for pair in arguments[2..].chunks(2) {
            fields.push((pair[0].clone(), pair[1].clone()));
        }

        Ok(Self {
            key: arguments[0].clone(),
            stream_id: arguments[1].clone(),
            fields,
        })
    }
}

/// Handles the XADD command.
///
/// Appends an entry to the stream at `key`, creating the stream when
/// absent. The entry ID must be strictly greater than the current top
/// entry; `*` and `<ms>-*` forms are auto-generated. A successful append
/// wakes every reader blocked on the key.
///
/// # Returns
///
/// * `Ok(CommandResult)` - Bulk string of the assigned ID
/// * `Err(CommandError::InvalidXAddCommand)` - On malformed arguments
/// * `Err(CommandError::InvalidStreamId)` - On `0-0`, a non-increasing ID,
///   or an unparseable ID
pub async fn xadd(
    store: Arc<Mutex<KeyValueStore>>,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let xadd_arguments = XaddArguments::parse(arguments)?;

    let assigned_id = {
        let mut store_guard = store.lock().await;
        let stream = store_guard.stream_entry_or_default(&xadd_arguments.key);

        let assigned_id = resolve_xadd_stream_id(&xadd_arguments.stream_id, stream.last_id())
            .map_err(CommandError::InvalidStreamId)?;

        stream.append(StreamEntry {
            id: assigned_id,
            fields: xadd_arguments.fields,
        });

        assigned_id
    };

    let mut state_guard = state.lock().await;
    state_guard.notify_stream_subscribers(&xadd_arguments.key);

    Ok(CommandResult::Response(
        RespValue::BulkString(assigned_id.to_string()).encode(),
    ))
}
