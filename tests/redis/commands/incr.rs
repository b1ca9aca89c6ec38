use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_incr_initialises_missing_key_to_one() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::command(&["INCR", "counter"]),
        &client,
        &TestUtils::expected_integer(1),
    )
    .await;
}

#[tokio::test]
async fn test_incr_applied_n_times_yields_n() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    for expected in 1..=5 {
        env.exec_command_ok(
            TestUtils::command(&["INCR", "counter"]),
            &client,
            &TestUtils::expected_integer(expected),
        )
        .await;
    }
}

#[tokio::test]
async fn test_incr_continues_from_stored_integer() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(TestUtils::command(&["SET", "counter", "41"]), &client, "+OK\r\n")
        .await;
    env.exec_command_ok(
        TestUtils::command(&["INCR", "counter"]),
        &client,
        &TestUtils::expected_integer(42),
    )
    .await;
}

#[tokio::test]
async fn test_incr_rejects_non_integer_value() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(TestUtils::command(&["SET", "fruit", "mango"]), &client, "+OK\r\n")
        .await;
    env.exec_command_ok(
        TestUtils::command(&["INCR", "fruit"]),
        &client,
        &TestUtils::expected_error("ERR value is not an integer or out of range"),
    )
    .await;

    // The stored value is untouched
    env.exec_command_ok(
        TestUtils::command(&["GET", "fruit"]),
        &client,
        &TestUtils::expected_bulk_string("mango"),
    )
    .await;
}

#[tokio::test]
async fn test_incr_arity() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::command(&["INCR"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_error("ERR Invalid INCR command"),
    )
    .await;
}
