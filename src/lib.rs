//! A Redis-compatible in-memory data server.
//!
//! This crate provides the core of a server speaking the RESP wire
//! protocol over TCP:
//!
//! - String keys with per-key expiry (GET, SET, INCR, KEYS, TYPE)
//! - Append-only streams with blocking reads (XADD, XRANGE, XREAD)
//! - Client-side transactions (MULTI, EXEC, DISCARD)
//! - Master/replica replication with command propagation,
//!   acknowledgement-based WAIT, and RDB full resync
//! - An RDB snapshot reader used to warm the keyspace at startup
//!
//! Concurrency is handled with async/await on Tokio: one task per
//! connection, with the keyspace and replica registry shared behind locks.

pub mod commands;
pub mod connection;
pub mod input;
pub mod key_value_store;
pub mod rdb;
pub mod resp;
pub mod server;
pub mod state;
