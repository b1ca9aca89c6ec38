use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_info_replication_on_master() {
    let env = TestEnv::new_master_server();

    let response = env
        .exec_command(
            TestUtils::command(&["INFO", "replication"]),
            &TestUtils::client_address(41844),
        )
        .await;

    let repl_id = {
        let server_guard = env.server.read().await;
        server_guard.repl_id.clone()
    };

    let expected_section = format!(
        "# Replication\r\nrole:master\r\nmaster_replid:{}\r\nmaster_repl_offset:0\r\n",
        repl_id
    );

    assert_eq!(
        response,
        format!("${}\r\n{}\r\n", expected_section.len(), expected_section)
    );
}

#[tokio::test]
async fn test_info_replication_on_replica_reports_slave_role() {
    let env = TestEnv::new_replica_server();

    let response = env
        .exec_command(
            TestUtils::command(&["INFO", "replication"]),
            &TestUtils::client_address(41844),
        )
        .await;

    assert!(response.contains("role:slave"));
}

#[tokio::test]
async fn test_info_rejects_unknown_sections() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::command(&["INFO", "keyspace"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_error("ERR Invalid INFO section"),
    )
    .await;
}
