use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::CommandResult,
        stream_utils::{parse_range_end, parse_range_start, stream_entries_to_resp},
    },
    key_value_store::{KeyValueStore, StreamEntry},
    resp::RespValue,
};

pub struct XrangeArguments {
    key: String,
    start: String,
    end: String,
}

impl XrangeArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 3 {
            return Err(CommandError::InvalidXRangeCommand);
        }

        Ok(Self {
            key: arguments[0].clone(),
            start: arguments[1].clone(),
            end: arguments[2].clone(),
        })
    }
}

/// Handles the XRANGE command.
///
/// Returns the entries whose IDs fall inside `[start, end]`, both ends
/// inclusive. `-` starts at the beginning of the stream, `+` runs to its
/// end, and a bare timestamp covers every sequence number of that
/// timestamp. A missing stream yields an empty array.
pub async fn xrange(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let xrange_arguments = XrangeArguments::parse(arguments)?;

    let start =
        parse_range_start(&xrange_arguments.start).map_err(CommandError::InvalidStreamId)?;
    let end = parse_range_end(&xrange_arguments.end).map_err(CommandError::InvalidStreamId)?;

    let store_guard = store.lock().await;

    let Some(stream) = store_guard.stream(&xrange_arguments.key) else {
        return Ok(CommandResult::Response(RespValue::Array(vec![]).encode()));
    };

    let entries = stream
        .entries
        .iter()
        .filter(|entry| {
            entry.id >= start
                && match end {
                    Some(end) => entry.id <= end,
                    None => true,
                }
        })
        .collect::<Vec<&StreamEntry>>();

    Ok(CommandResult::Response(
        stream_entries_to_resp(entries).encode(),
    ))
}
