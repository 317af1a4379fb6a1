//! Protocol-level end-to-end tests
//!
//! Whole sessions through the real transport loop: framing, envelope
//! errors, lifecycle ordering and dispatch errors.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use sapphire_duck::protocol::types::{MCP_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
use sapphire_duck::{McpServer, SessionState, ToolRegistry};
use sapphire_duck_e2e_tests::harness::{content_texts, SessionClient};
use sapphire_duck_e2e_tests::mocks::{CountingTool, EmptyTool, FailingTool, PanickingTool};
use serde_json::json;

const QUIET: Duration = Duration::from_millis(100);

fn mock_server() -> (McpServer, Arc<std::sync::atomic::AtomicUsize>) {
    let (counting, calls) = CountingTool::with_counter();
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(counting)).unwrap();
    registry.register(Arc::new(FailingTool)).unwrap();
    registry.register(Arc::new(PanickingTool)).unwrap();
    registry.register(Arc::new(EmptyTool)).unwrap();
    (McpServer::new(Arc::new(registry)), calls)
}

// ============================================================================
// HANDSHAKE
// ============================================================================

#[tokio::test]
async fn test_handshake_then_tools_list() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);

    let init = client.handshake().await;
    assert_eq!(init["serverInfo"]["name"], "sapphire-duck");
    assert_eq!(init["protocolVersion"], "2024-11-05");

    let tools = client.list_tools().await;
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["count", "fail", "panic", "empty"]);

    let (result, state) = client.hang_up().await;
    assert!(result.is_ok());
    assert_eq!(state, SessionState::Closed);
}

#[tokio::test]
async fn test_initialized_notification_gets_no_response() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);

    client.handshake().await;
    assert!(client.try_recv(QUIET).await.is_none());
}

#[tokio::test]
async fn test_version_negotiation() {
    for (requested, expected) in [
        ("2024-11-05", "2024-11-05"),
        (MCP_VERSION, MCP_VERSION),
        ("2030-01-01", MCP_VERSION),
    ] {
        let (server, _) = mock_server();
        let mut client = SessionClient::start(server);
        let response = client
            .request(
                "initialize",
                json!({
                    "protocolVersion": requested,
                    "capabilities": {},
                    "clientInfo": {"name": "e2e", "version": "1"}
                }),
            )
            .await;
        assert_eq!(response["result"]["protocolVersion"], expected);
        assert!(SUPPORTED_PROTOCOL_VERSIONS.contains(&expected));
    }
}

#[tokio::test]
async fn test_requests_before_ready_are_out_of_order() {
    let (server, calls) = mock_server();
    let mut client = SessionClient::start(server);

    let response = client.request("tools/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32003);

    client
        .request(
            "initialize",
            json!({"protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": {"name": "e2e", "version": "1"}}),
        )
        .await;
    // Initializing: still not allowed to call tools
    let response = client.call_tool("count", json!({"n": 1})).await;
    assert_eq!(response["error"]["code"], -32003);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The session survives and can finish the handshake
    client.notify("notifications/initialized").await;
    let response = client.call_tool("count", json!({"n": 1})).await;
    assert!(response.get("error").is_none());
}

#[tokio::test]
async fn test_initialize_with_missing_fields() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);

    let response = client
        .request("initialize", json!({"protocolVersion": "2024-11-05", "capabilities": {}}))
        .await;
    assert_eq!(response["error"]["code"], -32602);

    // A corrected initialize still works
    client.handshake().await;
}

#[tokio::test]
async fn test_second_initialize_rejected() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    let response = client
        .request(
            "initialize",
            json!({"protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": {"name": "e2e", "version": "1"}}),
        )
        .await;
    assert_eq!(response["error"]["code"], -32003);
    assert_eq!(client.list_tools().await.len(), 4);
}

// ============================================================================
// FRAMING & ENVELOPE
// ============================================================================

#[tokio::test]
async fn test_parse_error_is_dropped_and_session_continues() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);

    client.send_raw("{\"jsonrpc\": \"2.0\", \"id\": 1,\n").await;
    assert!(client.try_recv(QUIET).await.is_none());

    client.handshake().await;
}

#[tokio::test]
async fn test_envelope_error_with_id_is_answered() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);

    client.send_raw("{\"jsonrpc\":\"1.0\",\"id\":\"legacy\",\"method\":\"ping\"}\n").await;
    let response = client.recv().await;
    assert_eq!(response["id"], "legacy");
    assert_eq!(response["error"]["code"], -32600);
}

#[tokio::test]
async fn test_blank_lines_and_crlf_are_tolerated() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    client.send_raw("\n\r\n{\"jsonrpc\":\"2.0\",\"id\":\"p\",\"method\":\"ping\"}\r\n").await;
    let response = client.recv().await;
    assert_eq!(response["id"], "p");
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn test_string_and_numeric_ids_keep_their_type() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    client.send(&json!({"jsonrpc": "2.0", "id": "42", "method": "ping"})).await;
    let response = client.recv().await;
    assert!(response["id"].is_string());

    client.send(&json!({"jsonrpc": "2.0", "id": 42, "method": "ping"})).await;
    let response = client.recv().await;
    assert!(response["id"].is_number());
}

#[tokio::test]
async fn test_pipelined_requests_answered_in_order() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    for id in 10..15 {
        client.send(&json!({"jsonrpc": "2.0", "id": id, "method": "ping"})).await;
    }
    for id in 10..15 {
        assert_eq!(client.recv().await["id"], id);
    }
}

// ============================================================================
// DISPATCH
// ============================================================================

#[tokio::test]
async fn test_unknown_method_and_tool() {
    let (server, calls) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    let response = client.request("prompts/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);

    let response = client.call_tool("missing", json!({"n": "bad"})).await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_argument_errors() {
    let (server, calls) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    for arguments in [json!({}), json!({"n": "3"}), json!({"n": 3, "extra": 1}), json!([3])] {
        let response = client.call_tool("count", arguments).await;
        assert_eq!(response["error"]["code"], -32602, "{}", response);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let response = client.call_tool("count", json!({"n": 3})).await;
    assert_eq!(content_texts(&response), vec!["1", "2", "3"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tool_failures_are_error_outcomes() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    for name in ["fail", "panic"] {
        let response = client.call_tool(name, json!({})).await;
        assert!(response.get("error").is_none(), "{}", response);
        assert_eq!(response["result"]["isError"], true);
        assert!(content_texts(&response)[0].starts_with("Error: "));
    }

    // Still serving after a panic
    assert_eq!(client.list_tools().await.len(), 4);
}

#[tokio::test]
async fn test_empty_content_is_internal_error() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    let response = client.call_tool("empty", json!({})).await;
    assert_eq!(response["error"]["code"], -32603);
}

#[tokio::test]
async fn test_tools_list_is_stable() {
    let (server, _) = mock_server();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    let first = client.list_tools().await;
    client.call_tool("count", json!({"n": 2})).await;
    assert_eq!(client.list_tools().await, first);
}
