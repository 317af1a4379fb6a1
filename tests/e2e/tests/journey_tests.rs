//! Journey tests
//!
//! Complete client sessions from connect to hang-up, including state that
//! outlives a session.

use std::sync::Arc;

use sapphire_duck::startup;
use sapphire_duck::SessionState;
use sapphire_duck_core::SENT_FOLDER;
use sapphire_duck_e2e_tests::harness::{content_texts, SessionClient, TestMailbox};
use serde_json::json;

const ME: &str = "me@example.com";
const FRIEND: &str = "friend@example.com";

#[tokio::test]
async fn test_driver_scenario() {
    let mailbox = TestMailbox::with_accounts(&[ME]);
    mailbox.seed_inbox(ME, 4);
    let mut client = SessionClient::start(mailbox.server());

    let init = client
        .request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "t", "version": "1.0.0"}
            }),
        )
        .await;
    assert!(init["result"]["serverInfo"].is_object());
    assert!(init["result"]["instructions"].is_string());
    client.notify("notifications/initialized").await;

    let tools = client.list_tools().await;
    assert!(tools.iter().any(|t| t["name"] == "read_emails"));

    let response = client.call_tool("read_emails", json!({"limit": 2})).await;
    let content = response["result"]["content"].as_array().unwrap();
    assert!(content.len() <= 2);

    let (result, state) = client.hang_up().await;
    assert!(result.is_ok());
    assert_eq!(state, SessionState::Closed);
}

#[tokio::test]
async fn test_conversation_across_sessions() {
    let mailbox = TestMailbox::with_accounts(&[ME, FRIEND]);

    // First session: send a message to a local friend
    let mut client = SessionClient::start(mailbox.server());
    client.handshake().await;
    client
        .call_tool(
            "send_email",
            json!({"to": FRIEND, "subject": "Ducks", "body": "Seen any lately?"}),
        )
        .await;
    client.hang_up().await;

    // Second session on a fresh handle over the same files: the friend
    // reads and replies
    let reopened = Arc::new(mailbox.reopen());
    let server = startup::build_server(reopened.clone(), &[]).unwrap();
    let mut client = SessionClient::start(server);
    client.handshake().await;

    let listing = content_texts(
        &client
            .call_tool("read_emails", json!({"account": FRIEND, "unread": true}))
            .await,
    );
    assert_eq!(listing.len(), 1);
    let id: i64 = listing[0]
        .lines()
        .find_map(|line| line.strip_prefix("ID: "))
        .and_then(|id| id.parse().ok())
        .expect("listing shows the message id");

    let full = content_texts(&client.call_tool("get_email", json!({"id": id, "account": FRIEND})).await);
    assert!(full[0].contains("Seen any lately?"));

    client
        .call_tool(
            "send_email",
            json!({"to": ME, "subject": "Re: Ducks", "body": "Three mallards.", "from": FRIEND}),
        )
        .await;
    client.hang_up().await;

    assert_eq!(mailbox.unread_count(FRIEND), 0);
    assert_eq!(mailbox.message_count(FRIEND, Some(SENT_FOLDER)), 1);
    assert_eq!(reopened.count(Some(ME), None, true).unwrap(), 1);
}
