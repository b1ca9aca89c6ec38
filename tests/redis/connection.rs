use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use minired::{
    connection::{handle_client_connection, handle_master_connection},
    input::handshake,
    rdb::EMPTY_RDB,
    server::RedisServer,
};
use regex::Regex;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};

use crate::test_utils::{TestEnv, TestUtils};

/// Binds an ephemeral port and serves the environment's keyspace on it,
/// one connection task per accepted client.
async fn spawn_test_server(env: &TestEnv) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let env = env.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, client_address)) = listener.accept().await else {
                break;
            };

            let connection_env = env.clone();

            tokio::spawn(async move {
                handle_client_connection(
                    stream,
                    connection_env.server,
                    client_address.to_string(),
                    connection_env.store,
                    connection_env.state,
                )
                .await;
            });
        }
    });

    address
}

async fn send_and_read(stream: &mut TcpStream, request: &[u8]) -> String {
    stream.write_all(request).await.unwrap();
    stream.flush().await.unwrap();

    read_reply(stream).await
}

async fn read_reply(stream: &mut TcpStream) -> String {
    let mut chunk = [0u8; 4096];

    let number_of_bytes = timeout(Duration::from_secs(1), stream.read(&mut chunk))
        .await
        .expect("server should reply within a second")
        .unwrap();

    String::from_utf8_lossy(&chunk[..number_of_bytes]).to_string()
}

#[tokio::test]
async fn test_ping_over_the_wire() {
    let env = TestEnv::new_master_server();
    let address = spawn_test_server(&env).await;

    let mut client = TcpStream::connect(address).await.unwrap();

    let response = send_and_read(&mut client, b"*1\r\n$4\r\nPING\r\n").await;
    assert_eq!(response, "+PONG\r\n");
}

#[tokio::test]
async fn test_set_get_with_expiry_over_the_wire() {
    let env = TestEnv::new_master_server();
    let address = spawn_test_server(&env).await;

    let mut client = TcpStream::connect(address).await.unwrap();

    let response = send_and_read(
        &mut client,
        b"*5\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nPX\r\n$3\r\n100\r\n",
    )
    .await;
    assert_eq!(response, "+OK\r\n");

    let response = send_and_read(&mut client, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await;
    assert_eq!(response, "$1\r\nv\r\n");

    TestUtils::sleep_ms(150).await;

    let response = send_and_read(&mut client, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await;
    assert_eq!(response, "$-1\r\n");
}

#[tokio::test]
async fn test_transaction_over_the_wire() {
    let env = TestEnv::new_master_server();
    let address = spawn_test_server(&env).await;

    let mut client = TcpStream::connect(address).await.unwrap();

    let response = send_and_read(&mut client, b"*1\r\n$5\r\nMULTI\r\n").await;
    assert_eq!(response, "+OK\r\n");

    let response =
        send_and_read(&mut client, b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n").await;
    assert_eq!(response, "+QUEUED\r\n");

    let response = send_and_read(&mut client, b"*2\r\n$4\r\nINCR\r\n$1\r\na\r\n").await;
    assert_eq!(response, "+QUEUED\r\n");

    let response = send_and_read(&mut client, b"*1\r\n$4\r\nEXEC\r\n").await;
    assert_eq!(response, "*2\r\n+OK\r\n:2\r\n");
}

#[tokio::test]
async fn test_batched_requests_are_answered_in_order() {
    let env = TestEnv::new_master_server();
    let address = spawn_test_server(&env).await;

    let mut client = TcpStream::connect(address).await.unwrap();

    // Two pipelined requests in a single segment
    client
        .write_all(b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n")
        .await
        .unwrap();
    client.flush().await.unwrap();

    let mut received = String::new();

    while received.len() < "+PONG\r\n$3\r\nhey\r\n".len() {
        let mut chunk = [0u8; 256];
        let number_of_bytes = timeout(Duration::from_secs(1), client.read(&mut chunk))
            .await
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk[..number_of_bytes]));
    }

    assert_eq!(received, "+PONG\r\n$3\r\nhey\r\n");
}

#[tokio::test]
async fn test_inbound_handshake_over_the_wire() {
    let env = TestEnv::new_master_server();
    let address = spawn_test_server(&env).await;

    let mut replica_link = TcpStream::connect(address).await.unwrap();

    let response = send_and_read(&mut replica_link, b"*1\r\n$4\r\nPING\r\n").await;
    assert_eq!(response, "+PONG\r\n");

    let response = send_and_read(
        &mut replica_link,
        b"*3\r\n$8\r\nREPLCONF\r\n$14\r\nlistening-port\r\n$4\r\n6380\r\n",
    )
    .await;
    assert_eq!(response, "+OK\r\n");

    let response = send_and_read(
        &mut replica_link,
        b"*3\r\n$8\r\nREPLCONF\r\n$4\r\ncapa\r\n$6\r\npsync2\r\n",
    )
    .await;
    assert_eq!(response, "+OK\r\n");

    replica_link
        .write_all(b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n")
        .await
        .unwrap();

    // FULLRESYNC line plus the snapshot payload, possibly split across reads
    let expected_length = "+FULLRESYNC 0123456789012345678901234567890123456789 0\r\n$88\r\n".len()
        + EMPTY_RDB.len();
    let mut received = Vec::new();

    while received.len() < expected_length {
        let mut chunk = [0u8; 1024];
        let number_of_bytes = timeout(Duration::from_secs(1), replica_link.read(&mut chunk))
            .await
            .expect("master should send the full resync payload")
            .unwrap();
        received.extend_from_slice(&chunk[..number_of_bytes]);
    }

    let header = String::from_utf8_lossy(&received[..expected_length - EMPTY_RDB.len()]);
    let fullresync = Regex::new(r"^\+FULLRESYNC [a-z0-9]{40} 0\r\n\$88\r\n$").unwrap();
    assert!(fullresync.is_match(&header), "unexpected header: {:?}", header);

    assert_eq!(
        &received[expected_length - EMPTY_RDB.len()..expected_length],
        EMPTY_RDB,
        "payload must be the empty snapshot, with no trailing CRLF"
    );

    // The session is now registered as a replica
    let server_guard = env.server.read().await;
    assert_eq!(server_guard.registered_replica_count(), 1);
}

#[tokio::test]
async fn test_replication_propagates_writes_and_converges_offsets() {
    let master_env = TestEnv::new_master_server();
    let master_address = spawn_test_server(&master_env).await;

    // Bring up a replica connected through the real outbound handshake
    let replica_env = {
        let server = RedisServer::new(vec![
            "minired".to_string(),
            "--port".to_string(),
            "6390".to_string(),
            "--replicaof".to_string(),
            format!("127.0.0.1 {}", master_address.port()),
        ])
        .unwrap();

        TestEnv {
            server: Arc::new(RwLock::new(server)),
            store: Arc::new(tokio::sync::Mutex::new(
                minired::key_value_store::KeyValueStore::new(),
            )),
            state: Arc::new(tokio::sync::Mutex::new(minired::state::State::new())),
        }
    };

    let mut master_link = TcpStream::connect(master_address).await.unwrap();
    let leftover = handshake(&mut master_link, Arc::clone(&replica_env.server))
        .await
        .expect("outbound handshake should succeed");

    {
        let link_env = replica_env.clone();
        let master_address = master_address.to_string();

        tokio::spawn(async move {
            handle_master_connection(
                &master_address,
                master_link,
                leftover,
                link_env.server,
                link_env.store,
                link_env.state,
            )
            .await;
        });
    }

    // A client writes at the master
    let mut client = TcpStream::connect(master_address).await.unwrap();
    let response =
        send_and_read(&mut client, b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n").await;
    assert_eq!(response, "+OK\r\n");

    // The write reaches the replica's keyspace
    let mut replicated = false;
    for _ in 0..50 {
        TestUtils::sleep_ms(20).await;

        let mut store_guard = replica_env.store.lock().await;
        if store_guard.get("foo").map(|entry| entry.value.clone()) == Some("bar".to_string()) {
            replicated = true;
            break;
        }
    }
    assert!(replicated, "SET was not propagated to the replica");

    // After quiescence both sides account the same byte stream
    TestUtils::sleep_ms(50).await;
    let set_frame_length = "*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n".len();
    {
        let master_guard = master_env.server.read().await;
        let replica_guard = replica_env.server.read().await;

        assert_eq!(master_guard.repl_offset, set_frame_length);
        assert_eq!(replica_guard.repl_offset, set_frame_length);
    }

    // WAIT solicits an ack and reports the synced replica
    let response = send_and_read(&mut client, b"*3\r\n$4\r\nWAIT\r\n$1\r\n1\r\n$3\r\n500\r\n").await;
    assert_eq!(response, ":1\r\n");

    // The GETACK frame is absorbed into both offsets
    TestUtils::sleep_ms(100).await;
    let getack_frame_length = "*3\r\n$8\r\nREPLCONF\r\n$6\r\nGETACK\r\n$1\r\n*\r\n".len();
    {
        let master_guard = master_env.server.read().await;
        let replica_guard = replica_env.server.read().await;

        assert_eq!(
            master_guard.repl_offset,
            set_frame_length + getack_frame_length
        );
        assert_eq!(
            replica_guard.repl_offset,
            set_frame_length + getack_frame_length
        );
    }
}

#[tokio::test]
async fn test_replica_rejects_client_writes_but_serves_reads() {
    let env = TestEnv::new_replica_server();
    let address = spawn_test_server(&env).await;

    let mut client = TcpStream::connect(address).await.unwrap();

    let response =
        send_and_read(&mut client, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n").await;
    assert_eq!(
        response,
        "-ERR replica can only process read commands from clients\r\n"
    );

    let response = send_and_read(&mut client, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await;
    assert_eq!(response, "$-1\r\n");
}

#[tokio::test]
async fn test_replica_session_is_deregistered_on_disconnect() {
    let env = TestEnv::new_master_server();
    let address = spawn_test_server(&env).await;

    let mut replica_link = TcpStream::connect(address).await.unwrap();

    send_and_read(&mut replica_link, b"*1\r\n$4\r\nPING\r\n").await;
    send_and_read(
        &mut replica_link,
        b"*3\r\n$8\r\nREPLCONF\r\n$14\r\nlistening-port\r\n$4\r\n6380\r\n",
    )
    .await;
    send_and_read(
        &mut replica_link,
        b"*3\r\n$8\r\nREPLCONF\r\n$4\r\ncapa\r\n$6\r\npsync2\r\n",
    )
    .await;

    replica_link
        .write_all(b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n")
        .await
        .unwrap();

    // Drain the FULLRESYNC reply and snapshot
    let _ = read_reply(&mut replica_link).await;

    let mut registered = false;
    for _ in 0..50 {
        TestUtils::sleep_ms(20).await;

        let server_guard = env.server.read().await;
        if server_guard.registered_replica_count() == 1 {
            registered = true;
            break;
        }
    }
    assert!(registered, "replica was not registered after PSYNC");

    drop(replica_link);

    let mut deregistered = false;
    for _ in 0..50 {
        TestUtils::sleep_ms(20).await;

        let server_guard = env.server.read().await;
        if server_guard.registered_replica_count() == 0 {
            deregistered = true;
            break;
        }
    }
    assert!(deregistered, "replica was not deregistered after disconnect");
}
