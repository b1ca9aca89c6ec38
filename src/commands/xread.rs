use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use crate::{
    commands::{
        command_error::CommandError,
        command_handler::CommandResult,
        stream_utils::{parse_stream_id, stream_entries_to_resp},
    },
    key_value_store::{KeyValueStore, StreamEntry, StreamId},
    resp::RespValue,
    state::{State, StreamSubscriber},
};

pub struct XreadArguments {
    /// Milliseconds to block for; `Some(0)` blocks indefinitely, `None`
    /// makes the read non-blocking
    block_ms: Option<u64>,
    keys: Vec<String>,
    stream_ids: Vec<String>,
}

impl XreadArguments {
    /// Parses `XREAD [BLOCK ms] STREAMS key [key ...] id [id ...]`. The
    /// trailing ID list aligns positionally with the key list, so the part
    /// after `STREAMS` must split evenly in two.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        let mut remaining = arguments.as_slice();
        let mut block_ms = None;

        if remaining
            .first()
            .is_some_and(|argument| argument.to_uppercase() == "BLOCK")
        {
            let Some(duration) = remaining.get(1) else {
                return Err(CommandError::InvalidXReadCommand);
            };

            block_ms = Some(
                duration
                    .parse::<u64>()
                    .map_err(|_| CommandError::InvalidXReadBlockDuration)?,
            );
            remaining = &remaining[2..];
        }

        let Some(streams_token) = remaining.first() else {
            return Err(CommandError::InvalidXReadCommand);
        };

        if streams_token.to_uppercase() != "STREAMS" {
            return Err(CommandError::InvalidXReadOption);
        }

        let keys_and_ids = &remaining[1..];

        if keys_and_ids.is_empty() || keys_and_ids.len() % 2 != 0 {
            return Err(CommandError::InvalidXReadCommand);
        }

        let (keys, stream_ids) = keys_and_ids.split_at(keys_and_ids.len() / 2);

        Ok(Self {
            block_ms,
            keys: keys.to_vec(),
            stream_ids: stream_ids.to_vec(),
        })
    }
}

/// Handles the XREAD command.
///
/// For every key, returns the entries with IDs strictly greater than the
/// supplied ID. The special ID `$` resolves to the stream's last ID at the
/// time of the call, so it only ever observes entries appended afterwards.
///
/// With `BLOCK`, an empty result suspends the call until an `XADD` to one
/// of the keys produces a matching entry (`BLOCK 0`) or the timer expires
/// (`BLOCK ms`), in which case the reply is a null bulk string. Wake-ups
/// re-scan the streams, so a wake-up that raced another reader simply goes
/// back to waiting.
pub async fn xread(
    client_address: &str,
    store: Arc<Mutex<KeyValueStore>>,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let xread_arguments = XreadArguments::parse(arguments)?;

    let mut start_ids: Vec<StreamId> = Vec::with_capacity(xread_arguments.keys.len());

    {
        let store_guard = store.lock().await;

        for (key, stream_id) in xread_arguments
            .keys
            .iter()
            .zip(xread_arguments.stream_ids.iter())
        {
            if stream_id == "$" {
                let last_id = store_guard
                    .stream(key)
                    .and_then(|stream| stream.last_id())
                    .unwrap_or(StreamId::new(0, 0));

                start_ids.push(last_id);
            } else {
                let (milliseconds, sequence) =
                    parse_stream_id(stream_id).map_err(CommandError::InvalidStreamId)?;

                start_ids.push(StreamId::new(milliseconds, sequence.unwrap_or(0)));
            }
        }

        if let Some(response) = collect_results(&store_guard, &xread_arguments.keys, &start_ids) {
            return Ok(CommandResult::Response(response.encode()));
        }
    }

    let Some(block_ms) = xread_arguments.block_ms else {
        return Ok(CommandResult::Response(RespValue::NullBulkString.encode()));
    };

    let (sender, mut receiver) = mpsc::channel(16);

    {
        let mut state_guard = state.lock().await;

        for key in &xread_arguments.keys {
            state_guard.add_stream_subscriber(
                key.clone(),
                StreamSubscriber {
                    client_address: client_address.to_string(),
                    sender: sender.clone(),
                },
            );
        }
    }

    let deadline = (block_ms > 0).then(|| Instant::now() + Duration::from_millis(block_ms));

    // Re-scan before every wait: an append that raced the subscriber
    // registration is picked up here instead of being missed
    let result = loop {
        {
            let store_guard = store.lock().await;

            if let Some(response) =
                collect_results(&store_guard, &xread_arguments.keys, &start_ids)
            {
                break Some(response);
            }
        }

        let woken = match deadline {
            Some(deadline) => matches!(
                tokio::time::timeout_at(deadline, receiver.recv()).await,
                Ok(Some(()))
            ),
            None => receiver.recv().await.is_some(),
        };

        if !woken {
            break None;
        }
    };

    {
        let mut state_guard = state.lock().await;

        for key in &xread_arguments.keys {
            state_guard.remove_stream_subscriber(key, client_address);
        }
    }

    match result {
        Some(response) => Ok(CommandResult::Response(response.encode())),
        None => Ok(CommandResult::Response(RespValue::NullBulkString.encode())),
    }
}

/// Collects the per-key results, or `None` when no key has a qualifying
/// entry. Keys without matches (or without a stream at all) are omitted
/// from the reply.
fn collect_results(
    store: &KeyValueStore,
    keys: &[String],
    start_ids: &[StreamId],
) -> Option<RespValue> {
    let mut results = Vec::new();

    for (key, start_id) in keys.iter().zip(start_ids.iter()) {
        let Some(stream) = store.stream(key) else {
            continue;
        };

        let entries = stream
            .entries
            .iter()
            .filter(|entry| entry.id > *start_id)
            .collect::<Vec<&StreamEntry>>();

        if entries.is_empty() {
            continue;
        }

        results.push(RespValue::Array(vec![
            RespValue::BulkString(key.clone()),
            stream_entries_to_resp(entries),
        ]));
    }

    if results.is_empty() {
        None
    } else {
        Some(RespValue::Array(results))
    }
}
