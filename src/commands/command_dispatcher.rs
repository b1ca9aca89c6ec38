use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    commands::{
        CommandError, CommandHandler,
        command_handler::CommandResult,
        transactions::{discard, exec, multi},
    },
    key_value_store::KeyValueStore,
    resp::RespValue,
    server::RedisServer,
    state::State,
};

/// Work the connection loop performs after writing a command's reply.
#[derive(Debug)]
pub enum ExtraAction {
    /// Ship the full-resync snapshot and register the session as a replica
    /// (follows a successful `PSYNC`)
    SendRdbFile,
    /// Forward the original request arrays of successful writes to every
    /// registered replica
    PropagateWriteCommands(Vec<RespValue>),
}

/// Represents the result of dispatching a command.
///
/// Distinguishes immediate responses (such as "OK" or "QUEUED") from a
/// single command to execute and from a transaction batch released by
/// `EXEC`.
#[derive(Debug, PartialEq)]
pub enum DispatchResult {
    /// An immediate response string to be sent to the client.
    ImmediateResponse(String),
    /// A single command to be executed immediately.
    ExecuteSingleCommand(CommandHandler),
    /// A batch of commands to be executed as part of a transaction.
    ExecuteTransactionCommands(Vec<CommandHandler>),
}

impl DispatchResult {
    /// Executes the dispatched work and produces the RESP reply plus the
    /// follow-up action (snapshot shipping or write propagation) the
    /// connection loop must perform once the reply is on the wire.
    ///
    /// Transaction batches run in arrival order; each command's raw reply
    /// (or error frame) lands in the `*<n>` array, and the successful
    /// writes are collected for a single propagation pass.
    pub async fn handle_dispatch_result(
        &self,
        server: Arc<RwLock<RedisServer>>,
        client_address: &str,
        store: Arc<Mutex<KeyValueStore>>,
        state: Arc<Mutex<State>>,
    ) -> (String, Option<ExtraAction>) {
        match self {
            DispatchResult::ImmediateResponse(value) => (value.clone(), None),
            DispatchResult::ExecuteSingleCommand(command) => {
                match command
                    .handle_command(
                        Arc::clone(&server),
                        client_address,
                        Arc::clone(&store),
                        Arc::clone(&state),
                    )
                    .await
                {
                    Ok(CommandResult::Response(response)) => {
                        let extra_action = if command.name == "PSYNC" {
                            Some(ExtraAction::SendRdbFile)
                        } else if is_write_command(&server, &command.name).await {
                            Some(ExtraAction::PropagateWriteCommands(vec![
                                command.input.clone(),
                            ]))
                        } else {
                            None
                        };

                        (response, extra_action)
                    }
                    Ok(CommandResult::NoResponse) => (String::new(), None),
                    Ok(CommandResult::Batch(_)) => {
                        // Only EXEC produces batches, and the dispatcher
                        // resolves EXEC before execution reaches this point
                        (CommandError::InvalidCommand.as_string(), None)
                    }
                    Err(e) => (e.as_string(), None),
                }
            }
            DispatchResult::ExecuteTransactionCommands(commands) => {
                let mut responses = Vec::with_capacity(commands.len() + 1);
                responses.push(format!("*{}\r\n", commands.len()));

                let mut write_frames: Vec<RespValue> = Vec::new();

                for command in commands {
                    match command
                        .handle_command(
                            Arc::clone(&server),
                            client_address,
                            Arc::clone(&store),
                            Arc::clone(&state),
                        )
                        .await
                    {
                        Ok(CommandResult::Response(response)) => {
                            if is_write_command(&server, &command.name).await {
                                write_frames.push(command.input.clone());
                            }

                            responses.push(response);
                        }
                        Ok(_) => (),
                        Err(e) => {
                            responses.push(e.as_string());
                        }
                    }
                }

                let extra_action = if write_frames.is_empty() {
                    None
                } else {
                    Some(ExtraAction::PropagateWriteCommands(write_frames))
                };

                (responses.join(""), extra_action)
            }
        }
    }
}

async fn is_write_command(server: &Arc<RwLock<RedisServer>>, name: &str) -> bool {
    let server_guard = server.read().await;

    server_guard.write_commands.contains(&name)
}

/// The dispatcher in front of command execution: it owns the transaction
/// flow (`MULTI`/`EXEC`/`DISCARD` plus queueing) and hands everything else
/// through for execution.
pub struct CommandDispatcher {
    /// The address of the client connection (used for transaction context).
    pub client_address: String,
    /// Shared state for managing transactions and blocking operations.
    pub state: Arc<Mutex<State>>,
}

impl CommandDispatcher {
    pub fn new(client_address: &str, state: Arc<Mutex<State>>) -> Self {
        CommandDispatcher {
            client_address: client_address.to_string(),
            state,
        }
    }

    /// Routes a parsed command.
    ///
    /// # Transactional Behavior
    ///
    /// - `MULTI`: starts queueing and returns "OK"
    /// - `EXEC`: releases the queued commands for execution (or `*0` when
    ///   the queue is empty); queueing ends before the batch runs
    /// - `DISCARD`: drops the queue and returns "OK"
    /// - Other commands: queued with "QUEUED" while inside a transaction
    ///   (after arity validation), executed immediately otherwise
    pub async fn dispatch_command(
        &self,
        command: CommandHandler,
    ) -> Result<DispatchResult, CommandError> {
        match command.name.as_str() {
            "MULTI" => {
                let result =
                    multi(&self.client_address, Arc::clone(&self.state), command.arguments).await?;

                Ok(Self::into_dispatch_result(result))
            }
            "EXEC" => {
                let result =
                    exec(&self.client_address, Arc::clone(&self.state), command.arguments).await?;

                Ok(Self::into_dispatch_result(result))
            }
            "DISCARD" => {
                let result = discard(
                    &self.client_address,
                    Arc::clone(&self.state),
                    command.arguments,
                )
                .await?;

                Ok(Self::into_dispatch_result(result))
            }
            _ => {
                let mut state_guard = self.state.lock().await;

                if state_guard.get_transaction(&self.client_address).is_none() {
                    return Ok(DispatchResult::ExecuteSingleCommand(command));
                }

                if let Some(err) = command.validate_command_arguments() {
                    return Err(err);
                }

                state_guard.add_to_transaction(self.client_address.clone(), command)?;

                Ok(DispatchResult::ImmediateResponse(
                    RespValue::SimpleString("QUEUED".to_string()).encode(),
                ))
            }
        }
    }

    fn into_dispatch_result(result: CommandResult) -> DispatchResult {
        match result {
            CommandResult::Response(response) => DispatchResult::ImmediateResponse(response),
            CommandResult::Batch(commands) => DispatchResult::ExecuteTransactionCommands(commands),
            CommandResult::NoResponse => DispatchResult::ImmediateResponse(String::new()),
        }
    }
}
