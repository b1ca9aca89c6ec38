use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
    state::State,
};

pub struct ExecArguments;

impl ExecArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if !arguments.is_empty() {
            return Err(CommandError::InvalidExecCommand);
        }

        Ok(Self)
    }
}

/// Takes the queued commands for execution. Queueing mode ends here, before
/// any queued command runs, so the commands themselves are not re-queued.
pub async fn exec(
    client_address: &str,
    state: Arc<Mutex<State>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    ExecArguments::parse(arguments)?;

    let mut state_guard = state.lock().await;

    let Ok(transaction) = state_guard.remove_transaction(client_address) else {
        return Err(CommandError::ExecWithoutMulti);
    };

    if transaction.is_empty() {
        Ok(CommandResult::Response(
            RespValue::Array(Vec::new()).encode(),
        ))
    } else {
        Ok(CommandResult::Batch(transaction))
    }
}
