use regex::Regex;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_replconf_handshake_subcommands_reply_ok() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::command(&["REPLCONF", "listening-port", "6380"]),
        &client,
        "+OK\r\n",
    )
    .await;
    env.exec_command_ok(
        TestUtils::command(&["REPLCONF", "capa", "psync2"]),
        &client,
        "+OK\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_replconf_getack_reports_committed_offset() {
    let env = TestEnv::new_replica_server();

    env.exec_command_ok(
        TestUtils::command(&["REPLCONF", "GETACK", "*"]),
        &TestUtils::client_address(41844),
        "*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$1\r\n0\r\n",
    )
    .await;

    {
        let mut server_guard = env.server.write().await;
        server_guard.add_to_repl_offset(154);
    }

    env.exec_command_ok(
        TestUtils::command(&["REPLCONF", "GETACK", "*"]),
        &TestUtils::client_address(41844),
        "*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$3\r\n154\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_replconf_ack_updates_registry_without_reply() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    // An ACK never produces a reply, even from an unregistered peer
    env.exec_command_ok(TestUtils::command(&["REPLCONF", "ACK", "120"]), &client, "")
        .await;
}

#[tokio::test]
async fn test_replconf_argument_errors() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    let test_cases = vec![
        TestUtils::command(&["REPLCONF"]),
        TestUtils::command(&["REPLCONF", "listening-port"]),
        TestUtils::command(&["REPLCONF", "GETACK", "*", "extra"]),
        TestUtils::command(&["REPLCONF", "GETACK", "nope"]),
        TestUtils::command(&["REPLCONF", "unknown", "value"]),
    ];

    for request in test_cases {
        let response = env.exec_command(request, &client).await;
        assert!(
            response.starts_with("-ERR "),
            "expected an error, got {:?}",
            response
        );
    }
}

#[tokio::test]
async fn test_psync_replies_fullresync_with_repl_id() {
    let env = TestEnv::new_master_server();

    let response = env
        .exec_command(
            TestUtils::command(&["PSYNC", "?", "-1"]),
            &TestUtils::client_address(41844),
        )
        .await;

    let fullresync = Regex::new(r"^\+FULLRESYNC [a-z0-9]{40} 0\r\n$").unwrap();
    assert!(
        fullresync.is_match(&response),
        "unexpected PSYNC reply: {:?}",
        response
    );

    let repl_id = {
        let server_guard = env.server.read().await;
        server_guard.repl_id.clone()
    };
    assert!(response.contains(&repl_id));
}

#[tokio::test]
async fn test_psync_rejects_foreign_repl_id() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::command(&["PSYNC", "0123456789012345678901234567890123456789", "-1"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_error("ERR Invalid PSYNC replication ID"),
    )
    .await;
}

#[tokio::test]
async fn test_wait_with_no_replicas_returns_zero_immediately() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::command(&["WAIT", "3", "0"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_integer(0),
    )
    .await;

    env.exec_command_ok(
        TestUtils::command(&["WAIT", "3", "500"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_integer(0),
    )
    .await;
}

#[tokio::test]
async fn test_wait_is_rejected_on_a_replica() {
    let env = TestEnv::new_replica_server();

    env.exec_command_ok(
        TestUtils::command(&["WAIT", "1", "100"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_error("ERR Invalid WAIT command for replica"),
    )
    .await;
}

#[tokio::test]
async fn test_wait_argument_errors() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    let test_cases = vec![
        (
            TestUtils::command(&["WAIT", "1"]),
            TestUtils::expected_error("ERR Invalid WAIT command"),
        ),
        (
            TestUtils::command(&["WAIT", "one", "500"]),
            TestUtils::expected_error("ERR Invalid WAIT command argument"),
        ),
    ];

    for (request, expected) in test_cases {
        env.exec_command_ok(request, &client, &expected).await;
    }
}
