//! Server configuration and the main accept loop.
//!
//! This module owns the command-line parsing, the master/replica role split,
//! the replica registry used for propagation and `WAIT`, and the listener
//! loop that spawns one task per accepted connection. In replica mode it
//! also bootstraps the outbound replication link before serving clients.

use std::{collections::HashMap, sync::Arc};

use rand::Rng;
use regex::Regex;
use thiserror::Error;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Mutex, RwLock},
};

use crate::connection::{handle_client_connection, handle_master_connection};
use crate::input::handshake;
use crate::key_value_store::KeyValueStore;
use crate::rdb::parse_rdb_file;
use crate::state::State;

const REPL_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const REPL_ID_LENGTH: usize = 40;

/// Errors that can occur during command-line argument parsing and server setup.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("Invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("Invalid port flag value")]
    InvalidPortFlagValue,
    #[error("Invalid master address")]
    InvalidMasterAddress,
    #[error("Invalid master port")]
    InvalidMasterPort,
}

/// Represents the role of a server instance.
///
/// A server operates in one of two modes:
/// - Master: accepts write commands from clients and replicates them to replicas
/// - Replica: receives commands from a master server and serves read-only requests
#[derive(Debug, PartialEq, Clone)]
pub enum RedisRole {
    /// A master server that can accept write commands
    Master,
    /// A replica server connected to a master at the specified (host, port)
    Replica((String, u32)),
}

impl RedisRole {
    /// Returns the role string used by the INFO command ("slave" keeps the
    /// wire-protocol terminology).
    pub fn as_string(&self) -> &str {
        match self {
            RedisRole::Master => "master",
            RedisRole::Replica(_) => "slave",
        }
    }
}

/// A registered replica connection, held by a master server.
///
/// Only the write half is stored, keyed by remote address in the registry;
/// the registry never owns the session, so a dropped connection simply gets
/// deregistered.
#[derive(Debug, Clone)]
pub struct Replica {
    /// Shared writer used for command propagation and GETACK requests
    pub writer: Arc<RwLock<OwnedWriteHalf>>,
    /// Replication offset last acknowledged via REPLCONF ACK
    pub acked_offset: usize,
}

/// Configuration and runtime state for a server instance.
///
/// Holds network settings, replication configuration and the replica
/// registry. Cloned into an `Arc<RwLock<...>>` when the server starts so
/// that every connection task shares one instance.
#[derive(Debug, Clone)]
pub struct RedisServer {
    /// The TCP port number the server listens on
    pub port: u32,
    /// The server's role (Master or Replica with master address)
    pub role: RedisRole,
    /// Unique replication ID for this server instance (40 chars, [a-z0-9])
    pub repl_id: String,
    /// Bytes of write traffic emitted downstream (master) or committed from
    /// the master link (replica)
    pub repl_offset: usize,
    /// Directory containing the RDB snapshot, empty when not configured
    pub rdb_directory: String,
    /// File name of the RDB snapshot, empty when not configured
    pub rdb_filename: String,
    /// Map of replica connections keyed by remote address (masters only)
    pub replicas: Option<HashMap<String, Replica>>,
    /// Commands that mutate the keyspace and therefore propagate to replicas
    pub write_commands: Vec<&'static str>,
    /// Serialises WAIT so only one propagation+collection phase is in flight
    pub wait_lock: Arc<Mutex<()>>,
}

impl RedisServer {
    /// Creates a new server instance from command-line arguments.
    ///
    /// # Supported Arguments
    ///
    /// * `--port <port>` - Port number to listen on (default: 6379)
    /// * `--replicaof "<host> <port>"` - Configure as replica of the specified master
    /// * `--dir <path>` - Directory where the RDB snapshot lives
    /// * `--dbfilename <name>` - File name of the RDB snapshot
    ///
    /// # Returns
    ///
    /// * `Ok(RedisServer)` - Successfully configured server instance
    /// * `Err(CliError)` - If argument parsing fails or invalid values are provided
    pub fn new<I: IntoIterator<Item = String>>(command_line_args: I) -> Result<Self, CliError> {
        let mut iter = command_line_args.into_iter().skip(1);
        let mut port: Option<u32> = None;
        let mut redis_role: Option<RedisRole> = None;
        let mut rdb_directory: Option<String> = None;
        let mut rdb_filename: Option<String> = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--port" => {
                    let Some(port_str) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };

                    port = Some(validate_port_flag(&port_str)?);
                }
                "--replicaof" => {
                    let Some(master_address) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };

                    let validated_address = validate_master_address(&master_address)?;

                    redis_role = Some(RedisRole::Replica((
                        validated_address.0,
                        validated_address.1,
                    )));
                }
                "--dir" => {
                    let Some(dir) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };

                    rdb_directory = Some(dir);
                }
                "--dbfilename" => {
                    let Some(filename) = iter.next() else {
                        return Err(CliError::InvalidCommandLineFlag);
                    };

                    rdb_filename = Some(filename);
                }
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        let role = redis_role.unwrap_or(RedisRole::Master);

        let replicas = if role == RedisRole::Master {
            Some(HashMap::new())
        } else {
            None
        };

        Ok(RedisServer {
            port: port.unwrap_or(6379),
            role,
            repl_id: generate_repl_id(),
            repl_offset: 0,
            rdb_directory: rdb_directory.unwrap_or_default(),
            rdb_filename: rdb_filename.unwrap_or_default(),
            replicas,
            write_commands: Vec::from(["SET", "INCR", "XADD"]),
            wait_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Runs the server: warms the keyspace from the RDB snapshot when
    /// configured, bootstraps the replication link in replica mode, then
    /// accepts client connections until the process is terminated.
    ///
    /// A failed outbound handshake terminates the replication link only; the
    /// server keeps serving clients. A failed bind is returned to the caller
    /// so the process can exit nonzero.
    pub async fn run(&self) -> tokio::io::Result<()> {
        let store = Arc::new(Mutex::new(KeyValueStore::new()));
        let state = Arc::new(Mutex::new(State::new()));
        let server = Arc::new(RwLock::new(self.clone()));

        if !self.rdb_directory.is_empty() && !self.rdb_filename.is_empty() {
            if let Err(e) = parse_rdb_file(Arc::clone(&server), Arc::clone(&store)).await {
                eprintln!("Skipping RDB warm-up: {}", e);
            }
        }

        if let RedisRole::Replica((address, master_port)) = &self.role {
            let master_address = format!("{}:{}", address, master_port);

            match TcpStream::connect(&master_address).await {
                Ok(mut stream) => {
                    let server_clone = Arc::clone(&server);
                    let store_clone = Arc::clone(&store);
                    let state_clone = Arc::clone(&state);

                    match handshake(&mut stream, Arc::clone(&server)).await {
                        Ok(leftover) => {
                            tokio::spawn(async move {
                                handle_master_connection(
                                    &master_address,
                                    stream,
                                    leftover,
                                    server_clone,
                                    store_clone,
                                    state_clone,
                                )
                                .await;
                            });
                        }
                        Err(e) => {
                            eprintln!(
                                "Replication handshake with {} failed: {}",
                                master_address, e
                            );
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Failed to connect to master at {}: {}", master_address, e);
                }
            }
        }

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port)).await?;

        loop {
            match listener.accept().await {
                Ok((stream, client_address)) => {
                    let server_clone = Arc::clone(&server);
                    let store_clone = Arc::clone(&store);
                    let state_clone = Arc::clone(&state);

                    tokio::spawn(async move {
                        handle_client_connection(
                            stream,
                            server_clone,
                            client_address.to_string(),
                            store_clone,
                            state_clone,
                        )
                        .await;
                    });
                }
                Err(e) => {
                    eprintln!("error accepting connection: {}", e);
                }
            }
        }
    }

    /// Advances the replication offset by a serialised frame length. On a
    /// master this tracks emitted write traffic; on a replica it is the
    /// committed offset of the master link.
    pub fn add_to_repl_offset(&mut self, number_of_bytes: usize) {
        self.repl_offset += number_of_bytes;
    }

    pub fn insert_replica(&mut self, client_address: String, replica: Replica) {
        if let Some(replicas) = &mut self.replicas {
            replicas.insert(client_address, replica);
        }
    }

    pub fn remove_replica(&mut self, client_address: &str) {
        if let Some(replicas) = &mut self.replicas {
            replicas.remove(client_address);
        }
    }

    /// Records the offset a replica reported via `REPLCONF ACK`.
    pub fn set_replica_ack(&mut self, client_address: &str, acked_offset: usize) {
        if let Some(replicas) = &mut self.replicas {
            if let Some(replica) = replicas.get_mut(client_address) {
                replica.acked_offset = acked_offset;
            }
        }
    }

    pub fn registered_replica_count(&self) -> usize {
        self.replicas.as_ref().map_or(0, |replicas| replicas.len())
    }

    /// Number of replicas whose acknowledged offset has caught up with the
    /// master's replication offset.
    pub fn synced_replica_count(&self) -> usize {
        let Some(replicas) = &self.replicas else {
            return 0;
        };

        replicas
            .values()
            .filter(|replica| replica.acked_offset == self.repl_offset)
            .count()
    }
}

/// Generates a 40-character replication ID from `[a-z0-9]`.
fn generate_repl_id() -> String {
    let mut rng = rand::rng();

    (0..REPL_ID_LENGTH)
        .map(|_| REPL_ID_CHARSET[rng.random_range(0..REPL_ID_CHARSET.len())] as char)
        .collect()
}

/// Validates a port number from the --port command-line flag.
fn validate_port_flag(port: &str) -> Result<u32, CliError> {
    validate_port_with_error(port, CliError::InvalidPortFlagValue)
}

/// Validates a port number from a master address specification.
fn validate_master_port(port: &str) -> Result<u32, CliError> {
    validate_port_with_error(port, CliError::InvalidMasterPort)
}

/// Validates that a string represents a TCP port in the range 1-65535,
/// returning the given error otherwise.
fn validate_port_with_error(port: &str, error: CliError) -> Result<u32, CliError> {
    let port_number = port.parse::<u32>().map_err(|_| error.clone())?;

    if port_number < 1 || port_number > 65535 {
        return Err(error);
    }

    Ok(port_number)
}

/// Validates and parses a master server address specification.
///
/// The address comes from `--replicaof` in the format "host port" where host
/// is an IPv4 address or hostname and port is a valid TCP port number.
fn validate_master_address(master_address: &str) -> Result<(String, u32), CliError> {
    let ipv4_regex = Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap();
    let hostname_regex = Regex::new(r"^[a-zA-Z0-9\-\.]+$").unwrap();

    let split_address = master_address.split_whitespace().collect::<Vec<&str>>();

    if split_address.len() != 2 {
        return Err(CliError::InvalidMasterAddress);
    }

    let address = split_address[0];

    let valid_address = if let Some(caps) = ipv4_regex.captures(address) {
        caps.iter().skip(1).all(|octet| {
            octet
                .map(|m| m.as_str().parse::<u16>().map(|v| v <= 255).unwrap_or(false))
                .unwrap_or(false)
        })
    } else {
        hostname_regex.is_match(address)
    };

    if !valid_address {
        return Err(CliError::InvalidMasterAddress);
    }

    let port_number = validate_master_port(split_address[1])?;

    Ok((address.to_string(), port_number))
}

impl PartialEq for RedisServer {
    fn eq(&self, other: &Self) -> bool {
        self.port == other.port
            && self.role == other.role
            && self.repl_id == other.repl_id
            && self.repl_offset == other.repl_offset
            && self.rdb_directory == other.rdb_directory
            && self.rdb_filename == other.rdb_filename
    }
}
