use std::time::{SystemTime, SystemTimeError};

use crate::key_value_store::{StreamEntry, StreamId};
use crate::resp::RespValue;

const XADD_ID_TOO_SMALL: &str =
    "The ID specified in XADD is equal or smaller than the target stream top item";
const XADD_ID_ZERO: &str = "The ID specified in XADD must be greater than 0-0";

/// Parses a stream ID string into its components.
///
/// Stream IDs have the format "timestamp-sequence" where both parts are
/// integers. The sequence part is optional and callers decide its default
/// (0 for range starts, the maximum for range ends).
///
/// # Arguments
///
/// * `command_argument` - The stream ID string to parse (e.g., "1526919030474-5")
///
/// # Returns
///
/// * `Ok((u64, Option<u64>))` - Parsed timestamp and optional sequence number
/// * `Err(String)` - Error message if the stream ID is invalid
pub fn parse_stream_id(command_argument: &str) -> Result<(u64, Option<u64>), String> {
    let split_command_argument = command_argument.split("-").collect::<Vec<&str>>();

    if split_command_argument.len() > 2 {
        return Err("Stream ID cannot have more than 2 elements split by a hyphen".to_string());
    }

    let milliseconds = split_command_argument[0]
        .parse::<u64>()
        .map_err(|_| "The stream ID specified must be greater than 0".to_string())?;

    if split_command_argument.len() == 1 {
        return Ok((milliseconds, None));
    }

    let sequence = split_command_argument[1]
        .parse::<u64>()
        .map_err(|_| "The sequence specified must be greater than 0".to_string())?;

    Ok((milliseconds, Some(sequence)))
}

/// Resolves the ID argument of an XADD call against the stream's last entry.
///
/// Handles the three accepted forms:
/// - `"*"` - both parts auto-generated from the wall clock
/// - `"<ms>-*"` - explicit timestamp, auto-generated sequence
/// - `"<ms>-<seq>"` - fully explicit, validated for strict ordering
///
/// # Returns
///
/// * `Ok(StreamId)` - The ID to append, strictly greater than `last_id`
/// * `Err(String)` - The protocol error message (`0-0`, non-increasing ID, or
///   malformed input)
pub fn resolve_xadd_stream_id(
    stream_id: &str,
    last_id: Option<StreamId>,
) -> Result<StreamId, String> {
    if stream_id == "*" {
        let milliseconds = current_timestamp_ms()
            .map_err(|_| "System time is before unix epoch".to_string())?;
        let sequence = next_sequence_for(milliseconds, last_id)?;

        return Ok(StreamId::new(milliseconds, sequence));
    }

    let split_stream_id = stream_id.split("-").collect::<Vec<&str>>();

    if split_stream_id.len() != 2 {
        return Err("Invalid stream ID format".to_string());
    }

    let milliseconds = split_stream_id[0]
        .parse::<u64>()
        .map_err(|_| XADD_ID_ZERO.to_string())?;

    if split_stream_id[1] == "*" {
        let sequence = next_sequence_for(milliseconds, last_id)?;

        return Ok(StreamId::new(milliseconds, sequence));
    }

    let sequence = split_stream_id[1]
        .parse::<u64>()
        .map_err(|_| XADD_ID_ZERO.to_string())?;

    let candidate = StreamId::new(milliseconds, sequence);

    if candidate == StreamId::new(0, 0) {
        return Err(XADD_ID_ZERO.to_string());
    }

    if let Some(last_id) = last_id {
        if candidate <= last_id {
            return Err(XADD_ID_TOO_SMALL.to_string());
        }
    }

    Ok(candidate)
}

/// Picks the sequence number for an auto-generated ID with the given
/// timestamp: 0 for a fresh timestamp (1 when the timestamp itself is 0, so
/// that 0-0 is never produced), last sequence plus one when the timestamp
/// matches the top entry.
fn next_sequence_for(milliseconds: u64, last_id: Option<StreamId>) -> Result<u64, String> {
    let Some(last_id) = last_id else {
        return Ok(if milliseconds == 0 { 1 } else { 0 });
    };

    if milliseconds > last_id.ms {
        Ok(if milliseconds == 0 { 1 } else { 0 })
    } else if milliseconds == last_id.ms {
        Ok(last_id.seq + 1)
    } else {
        Err(XADD_ID_TOO_SMALL.to_string())
    }
}

/// Parses the `start` argument of XRANGE: `-` means the beginning of the
/// stream and a bare timestamp means sequence 0.
pub fn parse_range_start(argument: &str) -> Result<StreamId, String> {
    if argument == "-" {
        return Ok(StreamId::new(0, 0));
    }

    let (milliseconds, sequence) = parse_stream_id(argument)?;

    Ok(StreamId::new(milliseconds, sequence.unwrap_or(0)))
}

/// Parses the `end` argument of XRANGE: `+` means the end of the stream
/// (`None`) and a bare timestamp covers every sequence of that timestamp.
pub fn parse_range_end(argument: &str) -> Result<Option<StreamId>, String> {
    if argument == "+" {
        return Ok(None);
    }

    let (milliseconds, sequence) = parse_stream_id(argument)?;

    Ok(Some(StreamId::new(
        milliseconds,
        sequence.unwrap_or(u64::MAX),
    )))
}

/// Converts stream entries to the RESP shape shared by XRANGE and XREAD:
/// each entry is a 2-element array of the ID and the flat field/value list.
pub fn stream_entries_to_resp(entries: Vec<&StreamEntry>) -> RespValue {
    let mut response: Vec<RespValue> = Vec::with_capacity(entries.len());

    for entry in entries {
        let mut fields: Vec<RespValue> = Vec::with_capacity(entry.fields.len() * 2);

        for (field, value) in entry.fields.iter() {
            fields.push(RespValue::BulkString(field.clone()));
            fields.push(RespValue::BulkString(value.clone()));
        }

        response.push(RespValue::Array(vec![
            RespValue::BulkString(entry.id.to_string()),
            RespValue::Array(fields),
        ]));
    }

    RespValue::Array(response)
}

fn current_timestamp_ms() -> Result<u64, SystemTimeError> {
    let duration_since_epoch = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;

    Ok(duration_since_epoch.as_millis() as u64)
}
