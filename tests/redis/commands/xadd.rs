use minired::key_value_store::StreamId;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_xadd_appends_with_explicit_id() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::command(&["XADD", "fruits", "1526919030474-0", "mango", "apple"]),
        &client,
        &TestUtils::expected_bulk_string("1526919030474-0"),
    )
    .await;

    let store_guard = env.get_store().await;
    let stream = store_guard.stream("fruits").unwrap();

    assert_eq!(stream.entries.len(), 1);
    assert_eq!(stream.entries[0].id, StreamId::new(1526919030474, 0));
    assert_eq!(
        stream.entries[0].fields,
        vec![("mango".to_string(), "apple".to_string())]
    );
}

#[tokio::test]
async fn test_xadd_keeps_field_arrival_order() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::command(&["XADD", "sensor", "1-1", "zeta", "1", "alpha", "2"]),
        &client,
        &TestUtils::expected_bulk_string("1-1"),
    )
    .await;

    let store_guard = env.get_store().await;
    let stream = store_guard.stream("sensor").unwrap();

    assert_eq!(
        stream.entries[0].fields,
        vec![
            ("zeta".to_string(), "1".to_string()),
            ("alpha".to_string(), "2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_xadd_rejects_non_increasing_ids() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::command(&["XADD", "s", "1-1", "k", "v"]),
        &client,
        &TestUtils::expected_bulk_string("1-1"),
    )
    .await;

    env.exec_command_ok(
        TestUtils::command(&["XADD", "s", "1-1", "k", "v"]),
        &client,
        &TestUtils::expected_error(
            "ERR The ID specified in XADD is equal or smaller than the target stream top item",
        ),
    )
    .await;

    env.exec_command_ok(
        TestUtils::command(&["XADD", "s", "0-0", "k", "v"]),
        &client,
        &TestUtils::expected_error("ERR The ID specified in XADD must be greater than 0-0"),
    )
    .await;

    // The failed appends left the stream unchanged
    let store_guard = env.get_store().await;
    assert_eq!(store_guard.stream("s").unwrap().entries.len(), 1);
}

#[tokio::test]
async fn test_xadd_auto_generates_sequence_numbers() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_ok(
        TestUtils::command(&["XADD", "s", "5-*", "k", "v"]),
        &client,
        &TestUtils::expected_bulk_string("5-0"),
    )
    .await;
    env.exec_command_ok(
        TestUtils::command(&["XADD", "s", "5-*", "k", "v"]),
        &client,
        &TestUtils::expected_bulk_string("5-1"),
    )
    .await;
    env.exec_command_ok(
        TestUtils::command(&["XADD", "s", "6-*", "k", "v"]),
        &client,
        &TestUtils::expected_bulk_string("6-0"),
    )
    .await;
}

#[tokio::test]
async fn test_xadd_sequence_defaults_to_one_for_zero_timestamp() {
    let env = TestEnv::new_master_server();

    env.exec_command_ok(
        TestUtils::command(&["XADD", "s", "0-*", "k", "v"]),
        &TestUtils::client_address(41844),
        &TestUtils::expected_bulk_string("0-1"),
    )
    .await;
}

#[tokio::test]
async fn test_xadd_fully_auto_generated_ids_increase() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    let first = env
        .exec_command(TestUtils::command(&["XADD", "s", "*", "k", "v"]), &client)
        .await;
    let second = env
        .exec_command(TestUtils::command(&["XADD", "s", "*", "k", "v"]), &client)
        .await;

    assert!(first.starts_with('$'));
    assert!(second.starts_with('$'));

    let store_guard = env.get_store().await;
    let stream = store_guard.stream("s").unwrap();

    assert_eq!(stream.entries.len(), 2);
    assert!(stream.entries[1].id > stream.entries[0].id);
}

#[tokio::test]
async fn test_xadd_argument_errors() {
    let env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    let test_cases = vec![
        TestUtils::command(&["XADD"]),
        TestUtils::command(&["XADD", "s", "1-1"]),
        TestUtils::command(&["XADD", "s", "1-1", "k", "v", "dangling"]),
    ];

    for request in test_cases {
        env.exec_command_ok(
            request,
            &client,
            &TestUtils::expected_error("ERR Invalid XADD command"),
        )
        .await;
    }

    env.exec_command_ok(
        TestUtils::command(&["XADD", "s", "garbage", "k", "v"]),
        &client,
        &TestUtils::expected_error("ERR Invalid stream ID format"),
    )
    .await;
}
