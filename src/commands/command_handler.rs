use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    commands::{
        command_error::CommandError,
        config_get::{ConfigGetArguments, config_get},
        echo::{EchoArguments, echo},
        get::{GetArguments, get},
        incr::{IncrArguments, incr},
        info::{InfoArguments, info},
        keys::{KeysArguments, keys},
        ping::{PingArguments, ping},
        replication::{PsyncArguments, ReplconfArguments, WaitArguments, psync, replconf, wait},
        set::{SetArguments, set},
        transactions::{DiscardArguments, ExecArguments, MultiArguments},
        type_command::{TypeArguments, type_command},
        xadd::{XaddArguments, xadd},
        xrange::{XrangeArguments, xrange},
        xread::{XreadArguments, xread},
    },
    key_value_store::KeyValueStore,
    resp::RespValue,
    server::RedisServer,
    state::State,
};

/// Outcome of executing a single command.
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Nothing is written back (e.g. `REPLCONF ACK` at the master)
    NoResponse,
    /// A fully encoded RESP reply
    Response(String),
    /// Queued transaction commands released by `EXEC`
    Batch(Vec<CommandHandler>),
}

/// A parsed request: the upper-cased command name, its arguments, and the
/// original request array (kept for propagation and offset accounting).
#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<String>,
    pub input: RespValue,
}

impl CommandHandler {
    /// Builds a handler from a decoded request array.
    ///
    /// The command token is upper-cased for case-insensitive dispatch.
    /// `CONFIG GET` is folded into a single dispatch key so that the
    /// subcommand does not leak into the argument list.
    pub fn new(input: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = &input else {
            return Err(CommandError::InvalidCommand);
        };

        let name = match elements.get(0) {
            Some(RespValue::BulkString(s)) => s.to_uppercase(),
            _ => return Err(CommandError::InvalidCommandArgument),
        };

        let (name, rest_of_data) = match name.as_str() {
            "CONFIG" => {
                let sub_command = match elements.get(1) {
                    Some(RespValue::BulkString(s)) => s.to_uppercase(),
                    _ => return Err(CommandError::InvalidCommandArgument),
                };

                if sub_command == "GET" {
                    ("CONFIG GET".to_string(), elements[2..].to_vec())
                } else {
                    return Err(CommandError::InvalidCommandArgument);
                }
            }
            _ => (name, elements[1..].to_vec()),
        };

        let mut arguments: Vec<String> = Vec::new();

        for element in rest_of_data {
            let arg = match element {
                RespValue::BulkString(s) => Ok(s.to_string()),
                _ => Err(CommandError::InvalidCommand),
            }?;

            arguments.push(arg);
        }

        Ok(Self {
            name,
            arguments,
            input,
        })
    }

    /// Checks arity and argument shape without executing anything. Used
    /// before queueing inside a transaction, so a malformed command is
    /// rejected instead of queued.
    pub fn validate_command_arguments(&self) -> Option<CommandError> {
        match self.name.as_str() {
            "PING" => PingArguments::parse(self.arguments.clone()).err(),
            "ECHO" => EchoArguments::parse(self.arguments.clone()).err(),
            "GET" => GetArguments::parse(self.arguments.clone()).err(),
            "SET" => SetArguments::parse(self.arguments.clone()).err(),
            "INCR" => IncrArguments::parse(self.arguments.clone()).err(),
            "KEYS" => KeysArguments::parse(self.arguments.clone()).err(),
            "TYPE" => TypeArguments::parse(self.arguments.clone()).err(),
            "XADD" => XaddArguments::parse(self.arguments.clone()).err(),
            "XRANGE" => XrangeArguments::parse(self.arguments.clone()).err(),
            "XREAD" => XreadArguments::parse(self.arguments.clone()).err(),
            "MULTI" => MultiArguments::parse(self.arguments.clone()).err(),
            "EXEC" => ExecArguments::parse(self.arguments.clone()).err(),
            "DISCARD" => DiscardArguments::parse(self.arguments.clone()).err(),
            "INFO" => InfoArguments::parse(self.arguments.clone()).err(),
            "REPLCONF" => ReplconfArguments::parse(self.arguments.clone()).err(),
            "PSYNC" => PsyncArguments::parse(self.arguments.clone()).err(),
            "WAIT" => WaitArguments::parse(self.arguments.clone()).err(),
            "CONFIG GET" => ConfigGetArguments::parse(self.arguments.clone()).err(),
            _ => Some(CommandError::InvalidCommand),
        }
    }

    /// Executes the command against the shared server, store and state.
    ///
    /// `MULTI`/`EXEC`/`DISCARD` never reach this point; the dispatcher
    /// intercepts them before execution.
    pub(crate) async fn handle_command(
        &self,
        server: Arc<RwLock<RedisServer>>,
        client_address: &str,
        store: Arc<Mutex<KeyValueStore>>,
        state: Arc<Mutex<State>>,
    ) -> Result<CommandResult, CommandError> {
        match self.name.as_str() {
            "PING" => ping(self.arguments.clone()),
            "ECHO" => echo(self.arguments.clone()),
            "GET" => get(store, self.arguments.clone()).await,
            "SET" => set(store, self.arguments.clone()).await,
            "INCR" => incr(store, self.arguments.clone()).await,
            "KEYS" => keys(store, self.arguments.clone()).await,
            "TYPE" => type_command(store, self.arguments.clone()).await,
            "XADD" => xadd(store, state, self.arguments.clone()).await,
            "XRANGE" => xrange(store, self.arguments.clone()).await,
            "XREAD" => xread(client_address, store, state, self.arguments.clone()).await,
            "INFO" => info(server, self.arguments.clone()).await,
            "REPLCONF" => replconf(client_address, server, state, self.arguments.clone()).await,
            "PSYNC" => psync(server, self.arguments.clone()).await,
            "WAIT" => wait(server, state, self.arguments.clone()).await,
            "CONFIG GET" => config_get(server, self.arguments.clone()).await,
            _ => Err(CommandError::InvalidCommand),
        }
    }
}
