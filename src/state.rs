//! Process-wide session state: per-client transaction queues and the wake-up
//! channels behind blocking reads (`XREAD BLOCK`) and `WAIT`.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::commands::CommandHandler;

#[derive(Error, Debug, PartialEq)]
pub enum StateError {
    #[error("MULTI calls can not be nested")]
    TransactionAlreadyStarted,
    #[error("no transaction in progress")]
    TransactionNotFound,
}

impl StateError {
    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

/// A task blocked on a stream key, woken through its channel when `XADD`
/// appends to that key.
#[derive(Debug)]
pub struct StreamSubscriber {
    pub client_address: String,
    pub sender: mpsc::Sender<()>,
}

#[derive(Debug)]
pub struct State {
    transactions: HashMap<String, Vec<CommandHandler>>,
    stream_subscribers: HashMap<String, VecDeque<StreamSubscriber>>,
    ack_subscribers: Vec<mpsc::Sender<()>>,
}

impl State {
    pub fn new() -> Self {
        State {
            transactions: HashMap::new(),
            stream_subscribers: HashMap::new(),
            ack_subscribers: Vec::new(),
        }
    }

    pub fn start_transaction(&mut self, client_address: String) -> Result<(), StateError> {
        if self.transactions.contains_key(&client_address) {
            return Err(StateError::TransactionAlreadyStarted);
        }

        self.transactions.insert(client_address, Vec::new());

        Ok(())
    }

    pub fn add_to_transaction(
        &mut self,
        client_address: String,
        command: CommandHandler,
    ) -> Result<(), StateError> {
        let Some(queued_commands) = self.transactions.get_mut(&client_address) else {
            return Err(StateError::TransactionNotFound);
        };

        queued_commands.push(command);

        Ok(())
    }

    /// Takes the queued commands, clearing queueing mode before they run so
    /// that commands executed by `EXEC` are not re-queued.
    pub fn remove_transaction(
        &mut self,
        client_address: &str,
    ) -> Result<Vec<CommandHandler>, StateError> {
        self.transactions
            .remove(client_address)
            .ok_or(StateError::TransactionNotFound)
    }

    pub fn get_transaction(&self, client_address: &str) -> Option<&Vec<CommandHandler>> {
        self.transactions.get(client_address)
    }

    pub fn add_stream_subscriber(&mut self, key: String, subscriber: StreamSubscriber) {
        self.stream_subscribers
            .entry(key)
            .or_default()
            .push_back(subscriber);
    }

    pub fn remove_stream_subscriber(&mut self, key: &str, client_address: &str) {
        if let Some(subscribers) = self.stream_subscribers.get_mut(key) {
            subscribers.retain(|subscriber| subscriber.client_address != client_address);
        }
    }

    /// Wakes every task blocked on `key`. Dropped receivers are skipped; the
    /// woken task re-checks the stream itself, so a spurious wake-up is safe.
    pub fn notify_stream_subscribers(&mut self, key: &str) {
        if let Some(subscribers) = self.stream_subscribers.get_mut(key) {
            for subscriber in subscribers.iter() {
                let _ = subscriber.sender.try_send(());
            }
        }
    }

    pub fn add_ack_subscriber(&mut self, sender: mpsc::Sender<()>) {
        self.ack_subscribers.push(sender);
    }

    pub fn clear_ack_subscribers(&mut self) {
        self.ack_subscribers.clear();
    }

    /// Wakes `WAIT` after a `REPLCONF ACK` updated the replica registry.
    pub fn notify_ack_subscribers(&mut self) {
        for subscriber in self.ack_subscribers.iter() {
            let _ = subscriber.try_send(());
        }
    }
}
