use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_keys_enumerates_string_keys() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(TestUtils::command(&["SET", "fruit", "mango"]), &client, "+OK\r\n")
        .await;
    env.exec_command_ok(TestUtils::command(&["SET", "veggie", "leek"]), &client, "+OK\r\n")
        .await;

    let response = env.exec_command(TestUtils::command(&["KEYS", "*"]), &client).await;

    // Enumeration order is unspecified
    assert!(response.starts_with("*2\r\n"));
    assert!(response.contains("$5\r\nfruit\r\n"));
    assert!(response.contains("$6\r\nveggie\r\n"));
}

#[tokio::test]
async fn test_keys_does_not_enumerate_stream_keys() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::command(&["XADD", "sensor", "1-1", "temperature", "37"]),
        &client,
        &TestUtils::expected_bulk_string("1-1"),
    )
    .await;

    env.exec_command_ok(TestUtils::command(&["KEYS", "*"]), &client, "*0\r\n")
        .await;
}

#[tokio::test]
async fn test_keys_requires_star_pattern() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::command(&["KEYS", "fru*"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_error("ERR Invalid KEYS command"),
    )
    .await;
}

#[tokio::test]
async fn test_type_reports_string_stream_and_none() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(TestUtils::command(&["SET", "fruit", "mango"]), &client, "+OK\r\n")
        .await;
    env.exec_command_ok(
        TestUtils::command(&["XADD", "sensor", "1-1", "temperature", "37"]),
        &client,
        &TestUtils::expected_bulk_string("1-1"),
    )
    .await;

    env.exec_command_ok(TestUtils::command(&["TYPE", "fruit"]), &client, "+string\r\n")
        .await;
    env.exec_command_ok(TestUtils::command(&["TYPE", "sensor"]), &client, "+stream\r\n")
        .await;
    env.exec_command_ok(TestUtils::command(&["TYPE", "missing"]), &client, "+none\r\n")
        .await;
}

#[tokio::test]
async fn test_type_prefers_stream_on_collision() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(TestUtils::command(&["SET", "shared", "value"]), &client, "+OK\r\n")
        .await;
    env.exec_command_ok(
        TestUtils::command(&["XADD", "shared", "1-1", "field", "value"]),
        &client,
        &TestUtils::expected_bulk_string("1-1"),
    )
    .await;

    env.exec_command_ok(TestUtils::command(&["TYPE", "shared"]), &client, "+stream\r\n")
        .await;
}
