use std::{cmp, sync::Arc, time::Duration};

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::Instant;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    server::{RedisRole, RedisServer},
    state::State,
};

#[derive(Debug)]
pub struct WaitArguments {
    pub number_of_replicas: usize,
    /// `None` encodes a timeout of 0: report the current state without
    /// waiting for acknowledgements to arrive
    pub timeout: Option<Duration>,
}

impl WaitArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::InvalidWaitCommand);
        }

        let number_of_replicas = arguments[0]
            .parse::<usize>()
            .map_err(|_| CommandError::InvalidWaitCommandArgument)?;

        let timeout_ms = arguments[1]
            .parse::<u64>()
            .map_err(|_| CommandError::InvalidWaitCommandArgument)?;

        let timeout = match timeout_ms {
            0 => None,
            _ => Some(Duration::from_millis(timeout_ms)),
        };

        Ok(Self {
            number_of_replicas,
            timeout,
        })
    }
}

/// Handles the WAIT command.
///
/// When every registered replica has already acknowledged the master's
/// current offset, the registered count is returned immediately. Otherwise
/// a `REPLCONF GETACK *` is propagated to all replicas and the call waits,
/// up to the timeout, for their `REPLCONF ACK` replies to push the synced
/// count to `min(numreplicas, registered)`. The reply is the number of
/// synced replicas at return time, after which the master's offset absorbs
/// the GETACK frame it just emitted.
///
/// Only one WAIT is in flight at a time; overlapping calls queue on the
/// server's wait lock. The replica registry is re-read on every wake-up, so
/// replicas that register or drop out mid-wait are accounted for.
pub async fn wait(
    server: Arc<RwLock<RedisServer>>,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let wait_arguments = WaitArguments::parse(arguments)?;

    let wait_lock = {
        let server_guard = server.read().await;

        if let RedisRole::Replica(_) = server_guard.role {
            return Err(CommandError::InvalidWaitCommandForReplica);
        }

        Arc::clone(&server_guard.wait_lock)
    };
    let _wait_guard = wait_lock.lock().await;

    {
        let server_guard = server.read().await;
        let registered = server_guard.registered_replica_count();

        if server_guard.synced_replica_count() == registered {
            return Ok(CommandResult::Response(
                RespValue::Integer(registered as i64).encode(),
            ));
        }
    }

    let (sender, mut receiver) = mpsc::channel(64);
    {
        let mut state_guard = state.lock().await;
        state_guard.add_ack_subscriber(sender);
    }

    let getack_frame = RespValue::Array(vec![
        RespValue::BulkString("REPLCONF".to_string()),
        RespValue::BulkString("GETACK".to_string()),
        RespValue::BulkString("*".to_string()),
    ])
    .encode();

    propagate_getack(&server, &getack_frame).await;

    if let Some(timeout) = wait_arguments.timeout {
        let deadline = Instant::now() + timeout;

        loop {
            {
                let server_guard = server.read().await;
                let target = cmp::min(
                    wait_arguments.number_of_replicas,
                    server_guard.registered_replica_count(),
                );

                if server_guard.synced_replica_count() >= target {
                    break;
                }
            }

            match tokio::time::timeout_at(deadline, receiver.recv()).await {
                Ok(Some(())) => continue,
                // Timer expired, or every sender vanished
                _ => break,
            }
        }
    }

    {
        let mut state_guard = state.lock().await;
        state_guard.clear_ack_subscribers();
    }

    let synced = {
        let mut server_guard = server.write().await;
        let synced = server_guard.synced_replica_count();
        server_guard.add_to_repl_offset(getack_frame.len());

        synced
    };

    Ok(CommandResult::Response(
        RespValue::Integer(synced as i64).encode(),
    ))
}

/// Writes the GETACK frame to every registered replica. Replicas whose
/// socket write fails are deregistered.
async fn propagate_getack(server: &Arc<RwLock<RedisServer>>, getack_frame: &str) {
    use tokio::io::AsyncWriteExt;

    let writers: Vec<(String, Arc<RwLock<OwnedWriteHalf>>)> = {
        let server_guard = server.read().await;

        match &server_guard.replicas {
            Some(replicas) => replicas
                .iter()
                .map(|(address, replica)| (address.clone(), Arc::clone(&replica.writer)))
                .collect(),
            None => Vec::new(),
        }
    };

    let mut failed_addresses = Vec::new();

    for (address, writer) in writers {
        let mut writer_guard = writer.write().await;

        let write_result = async {
            writer_guard.write_all(getack_frame.as_bytes()).await?;
            writer_guard.flush().await
        }
        .await;

        if let Err(e) = write_result {
            eprintln!("Error requesting ack from replica {}: {}", address, e);
            failed_addresses.push(address);
        }
    }

    if !failed_addresses.is_empty() {
        let mut server_guard = server.write().await;

        for address in failed_addresses {
            server_guard.remove_replica(&address);
        }
    }
}
