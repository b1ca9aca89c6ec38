use std::sync::Arc;

use minired::{
    commands::{CommandDispatcher, CommandHandler},
    key_value_store::KeyValueStore,
    resp::RespValue,
    server::RedisServer,
    state::State,
};
use tokio::sync::{Mutex, RwLock};

/// Test utilities for building requests and expected replies
pub struct TestUtils;

/// Test environment containing server, store and state
pub struct TestEnv {
    pub server: Arc<RwLock<RedisServer>>,
    pub store: Arc<Mutex<KeyValueStore>>,
    pub state: Arc<Mutex<State>>,
}

impl TestEnv {
    /// Create a test environment running as a master server
    pub fn new_master_server() -> Self {
        Self::from_args(vec!["minired".to_string()])
    }

    /// Create a test environment running as a replica server
    pub fn new_replica_server() -> Self {
        Self::from_args(vec![
            "minired".to_string(),
            "--replicaof".to_string(),
            "localhost 6380".to_string(),
        ])
    }

    /// Create a test environment with RDB snapshot flags configured
    pub fn new_master_server_with_rdb_config(dir: &str, dbfilename: &str) -> Self {
        Self::from_args(vec![
            "minired".to_string(),
            "--dir".to_string(),
            dir.to_string(),
            "--dbfilename".to_string(),
            dbfilename.to_string(),
        ])
    }

    fn from_args(args: Vec<String>) -> Self {
        let server = RedisServer::new(args).unwrap();

        Self {
            server: Arc::new(RwLock::new(server)),
            store: Arc::new(Mutex::new(KeyValueStore::new())),
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    /// Clone the environment, sharing server, store and state
    pub fn clone(&self) -> Self {
        Self {
            server: Arc::clone(&self.server),
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
        }
    }

    /// Run a request through the dispatcher and return the bytes that would
    /// be written back to the client
    pub async fn exec_command(&self, request: RespValue, client_address: &str) -> String {
        let command_handler = match CommandHandler::new(request) {
            Ok(handler) => handler,
            Err(e) => return e.as_string(),
        };

        let dispatch_result = match CommandDispatcher::new(client_address, Arc::clone(&self.state))
            .dispatch_command(command_handler)
            .await
        {
            Ok(result) => result,
            Err(e) => return e.as_string(),
        };

        dispatch_result
            .handle_dispatch_result(
                Arc::clone(&self.server),
                client_address,
                Arc::clone(&self.store),
                Arc::clone(&self.state),
            )
            .await
            .0
    }

    /// Execute a command and assert the reply
    pub async fn exec_command_ok(&self, request: RespValue, client_address: &str, expected: &str) {
        let response = self.exec_command(request, client_address).await;
        assert_eq!(response, expected);
    }

    /// Get a guard on the store for inspection
    pub async fn get_store(&self) -> tokio::sync::MutexGuard<'_, KeyValueStore> {
        self.store.lock().await
    }
}

impl TestUtils {
    /// Build a request array from string tokens
    pub fn command(parts: &[&str]) -> RespValue {
        RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::BulkString(part.to_string()))
                .collect(),
        )
    }

    /// Generate a client address for testing
    pub fn client_address(port: u16) -> String {
        format!("127.0.0.1:{}", port)
    }

    /// Create expected bulk string response
    pub fn expected_bulk_string(value: &str) -> String {
        format!("${}\r\n{}\r\n", value.len(), value)
    }

    /// Create expected integer response
    pub fn expected_integer(value: i64) -> String {
        format!(":{}\r\n", value)
    }

    /// Create expected simple string response
    pub fn expected_simple_string(value: &str) -> String {
        format!("+{}\r\n", value)
    }

    /// Create expected simple error response
    pub fn expected_error(message: &str) -> String {
        format!("-{}\r\n", message)
    }

    /// Create expected null bulk string response
    pub fn expected_null() -> String {
        "$-1\r\n".to_string()
    }

    /// Create expected array of bulk strings response
    pub fn expected_array(items: &[&str]) -> String {
        let mut response = format!("*{}\r\n", items.len());
        for item in items {
            response.push_str(&format!("${}\r\n{}\r\n", item.len(), item));
        }
        response
    }

    /// Async sleep helper
    pub async fn sleep_ms(ms: u64) {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}
