//! Connection handling: the per-client session loop, the replica's
//! master-link loop, and the propagation fanout to registered replicas.
//!
//! Both loops share the RESP decoder and the command handlers; they differ
//! in reply policy (clients always get replies, the master link suppresses
//! everything except `REPLCONF` acks) and in offset accounting (only the
//! master link advances the committed offset).

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::{
    net::TcpStream,
    sync::{Mutex, RwLock},
};

use crate::rdb::send_full_resync_payload;
use crate::resp::RespValue;
use crate::server::RedisRole;
use crate::{
    commands::{CommandDispatcher, CommandError, CommandHandler, CommandResult, ExtraAction},
    input::{CommandReadError, read_and_parse_resp},
    key_value_store::KeyValueStore,
    server::RedisServer,
    state::State,
};

/// Handles a client connection.
///
/// Runs the full request/reply cycle: decode, dispatch (including
/// transaction queueing), write the reply, then perform any follow-up
/// action (full-resync payload after `PSYNC`, propagation after a write).
///
/// Replica servers reject client-issued writes here; writes only arrive
/// over the master link. Malformed framing drops the connection, per-request
/// errors are answered and the session continues, and a failed reply write
/// terminates the session, deregistering it first if it was a replica.
pub async fn handle_client_connection(
    stream: TcpStream,
    server: Arc<RwLock<RedisServer>>,
    client_address: String,
    store: Arc<Mutex<KeyValueStore>>,
    state: Arc<Mutex<State>>,
) {
    let mut buffer = BytesMut::with_capacity(1024);

    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(RwLock::new(writer));

    loop {
        let parsed_input = match read_and_parse_resp(&mut reader, &mut buffer).await {
            Ok(values) => values,
            Err(e) => {
                // Malformed framing and read failures both end the session;
                // a registered replica is deregistered on the way out
                if e != CommandReadError::ConnectionClosed {
                    eprintln!("Dropping connection {}: {}", client_address, e);
                }

                let mut server_guard = server.write().await;
                server_guard.remove_replica(&client_address);

                break;
            }
        };

        for input in parsed_input {
            let command_handler = match CommandHandler::new(input) {
                Ok(handler) => handler,
                Err(e) => {
                    eprintln!("Rejected request from {}: {}", client_address, e);

                    if let Err(e) =
                        write_to_stream(Arc::clone(&writer), e.as_string().as_bytes()).await
                    {
                        eprintln!("Error writing to stream: {}", e);
                    }
                    continue;
                }
            };

            if are_write_commands_forbidden(Arc::clone(&server), &command_handler).await {
                let error_message = CommandError::ReplicaReadOnlyCommands.as_string();

                if let Err(e) =
                    write_to_stream(Arc::clone(&writer), error_message.as_bytes()).await
                {
                    eprintln!("Error writing to stream: {}", e);
                }
                continue;
            }

            let dispatch_result = match CommandDispatcher::new(&client_address, Arc::clone(&state))
                .dispatch_command(command_handler)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    if let Err(e) =
                        write_to_stream(Arc::clone(&writer), e.as_string().as_bytes()).await
                    {
                        eprintln!("Error writing to stream: {}", e);
                    }
                    continue;
                }
            };

            let (response, extra_action) = dispatch_result
                .handle_dispatch_result(
                    Arc::clone(&server),
                    &client_address,
                    Arc::clone(&store),
                    Arc::clone(&state),
                )
                .await;

            if !response.is_empty() {
                if let Err(e) = write_to_stream(Arc::clone(&writer), response.as_bytes()).await {
                    eprintln!("Error writing response to stream: {}", e);

                    let mut server_guard = server.write().await;
                    server_guard.remove_replica(&client_address);

                    return;
                }
            }

            if let Some(extra_action) = extra_action {
                if let Err(e) = handle_extra_action(
                    &client_address,
                    Arc::clone(&writer),
                    Arc::clone(&server),
                    extra_action,
                )
                .await
                {
                    eprintln!("Error handling follow-up action: {}", e);
                }
            }
        }
    }
}

/// Handles the steady-state replication link on a replica.
///
/// Every request replayed from the master is applied silently; only
/// `REPLCONF GETACK` produces a reply, written back over the same stream.
/// After each request the committed offset advances by the request's
/// serialised length. For `GETACK` this happens after the reply is built,
/// so the ack carries the pre-increment offset.
///
/// `buffer` carries any bytes the master batched right behind the
/// handshake's snapshot payload.
pub async fn handle_master_connection(
    master_address: &str,
    mut stream: TcpStream,
    mut buffer: BytesMut,
    server: Arc<RwLock<RedisServer>>,
    store: Arc<Mutex<KeyValueStore>>,
    state: Arc<Mutex<State>>,
) {
    'link: loop {
        let parsed_input = match read_and_parse_resp(&mut stream, &mut buffer).await {
            Ok(values) => values,
            Err(e) => {
                if e != CommandReadError::ConnectionClosed {
                    eprintln!("Dropping master link: {}", e);
                }

                break;
            }
        };

        for input in parsed_input {
            let frame_length = input.encode().len();

            let command_result = match CommandHandler::new(input) {
                Ok(command_handler) => {
                    let result = command_handler
                        .handle_command(
                            Arc::clone(&server),
                            master_address,
                            Arc::clone(&store),
                            Arc::clone(&state),
                        )
                        .await;

                    match result {
                        Ok(command_result) if command_handler.name == "REPLCONF" => {
                            Some(command_result)
                        }
                        // Replies to replayed commands are suppressed
                        _ => None,
                    }
                }
                Err(_) => None,
            };

            if let Some(CommandResult::Response(response)) = command_result {
                let write_result = async {
                    stream.write_all(response.as_bytes()).await?;
                    stream.flush().await
                }
                .await;

                if let Err(e) = write_result {
                    eprintln!("Error writing ack to master: {}", e);
                    break 'link;
                }
            }

            // The offset covers every byte the master sent, whether or not
            // the request was understood
            let mut server_guard = server.write().await;
            server_guard.add_to_repl_offset(frame_length);
        }
    }
}

/// Performs the follow-up work attached to a dispatched command.
pub async fn handle_extra_action(
    client_address: &str,
    writer: Arc<RwLock<OwnedWriteHalf>>,
    server: Arc<RwLock<RedisServer>>,
    action: ExtraAction,
) -> tokio::io::Result<()> {
    match action {
        ExtraAction::SendRdbFile => {
            send_full_resync_payload(client_address, writer, server).await
        }
        ExtraAction::PropagateWriteCommands(frames) => {
            propagate_write_commands(server, frames).await;

            Ok(())
        }
    }
}

/// Forwards serialised write requests to every registered replica, in
/// registry order, advancing the master's replication offset by each
/// frame's length. Replicas whose socket write fails are deregistered.
async fn propagate_write_commands(server: Arc<RwLock<RedisServer>>, frames: Vec<RespValue>) {
    for frame in frames {
        let encoded = frame.encode();

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
            if let Err(e) = write_to_stream(writer, encoded.as_bytes()).await {
                eprintln!("Error propagating to replica {}: {}", address, e);
                failed_addresses.push(address);
            }
        }

        let mut server_guard = server.write().await;

        for address in failed_addresses {
            server_guard.remove_replica(&address);
        }

        server_guard.add_to_repl_offset(encoded.len());
    }
}

/// Writes a full response to a shared stream writer, draining it before the
/// lock is released.
async fn write_to_stream(
    writer: Arc<RwLock<OwnedWriteHalf>>,
    response: &[u8],
) -> tokio::io::Result<()> {
    let mut writer_guard = writer.write().await;
    writer_guard.write_all(response).await?;
    writer_guard.flush().await?;

    Ok(())
}

/// A replica accepts write commands only over the master link; a client
/// issuing one gets rejected before dispatch.
async fn are_write_commands_forbidden(
    server: Arc<RwLock<RedisServer>>,
    command_handler: &CommandHandler,
) -> bool {
    let server_guard = server.read().await;

    if let RedisRole::Replica(_) = server_guard.role {
        return server_guard
            .write_commands
            .contains(&command_handler.name.as_str());
    }

    false
}
