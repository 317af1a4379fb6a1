//! Email tool end-to-end tests
//!
//! The real email tools over a real (temporary) SQLite mailbox, driven
//! through full MCP sessions.

use sapphire_duck::config::AccountConfig;
use sapphire_duck_core::SENT_FOLDER;
use sapphire_duck_e2e_tests::harness::{content_texts, SessionClient, TestMailbox};
use sapphire_duck_e2e_tests::mocks::MailFactory;
use serde_json::json;

const ME: &str = "me@example.com";
const FRIEND: &str = "friend@example.com";

async fn ready_client(mailbox: &TestMailbox) -> SessionClient {
    let mut client = SessionClient::start(mailbox.server());
    client.handshake().await;
    client
}

#[tokio::test]
async fn test_no_accounts_no_tools() {
    let mailbox = TestMailbox::new_temp();
    let mut client = ready_client(&mailbox).await;
    assert!(client.list_tools().await.is_empty());

    let response = client.call_tool("read_emails", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn test_configured_accounts_are_created_on_startup() {
    let mailbox = TestMailbox::new_temp();
    let accounts = [AccountConfig {
        address: ME.to_string(),
        display_name: Some("Me".to_string()),
    }];
    let mut client = SessionClient::start(mailbox.server_with_accounts(&accounts));
    client.handshake().await;

    assert_eq!(client.list_tools().await.len(), 3);
    assert_eq!(mailbox.mailbox.accounts().unwrap()[0].display_name.as_deref(), Some("Me"));
}

#[tokio::test]
async fn test_tool_schemas_are_advertised() {
    let mailbox = TestMailbox::with_accounts(&[ME]);
    let mut client = ready_client(&mailbox).await;

    let tools = client.list_tools().await;
    let send = &tools[0];
    assert_eq!(send["name"], "send_email");
    assert_eq!(send["inputSchema"]["required"], json!(["to", "subject", "body"]));
    assert_eq!(tools[1]["inputSchema"]["properties"]["limit"]["type"], "integer");
    assert_eq!(tools[2]["inputSchema"]["required"], json!(["id"]));
}

#[tokio::test]
async fn test_read_emails_limit() {
    let mailbox = TestMailbox::with_accounts(&[ME]);
    mailbox.seed_inbox(ME, 5);
    let mut client = ready_client(&mailbox).await;

    let response = client.call_tool("read_emails", json!({"limit": 2})).await;
    let texts = content_texts(&response);
    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("Seeded message 4"));
    assert!(texts[1].contains("Seeded message 3"));
    assert_eq!(response["result"]["isError"], false);
}

#[tokio::test]
async fn test_read_emails_defaults_and_folders() {
    let mailbox = TestMailbox::with_accounts(&[ME]);
    MailFactory::create_mixed_inbox(&mailbox.mailbox, ME);
    let mut client = ready_client(&mailbox).await;

    let inbox = content_texts(&client.call_tool("read_emails", json!({})).await);
    assert_eq!(inbox.len(), 3);
    assert!(inbox[0].contains("Your feather order shipped"));

    let archive = content_texts(&client.call_tool("read_emails", json!({"folder": "Archive"})).await);
    assert_eq!(archive.len(), 2);

    let empty = content_texts(&client.call_tool("read_emails", json!({"folder": "Spam"})).await);
    assert_eq!(empty, vec!["No emails found matching the criteria"]);
}

#[tokio::test]
async fn test_read_emails_wrong_argument_type() {
    let mailbox = TestMailbox::with_accounts(&[ME]);
    let mut client = ready_client(&mailbox).await;

    let response = client.call_tool("read_emails", json!({"limit": "two"})).await;
    assert_eq!(response["error"]["code"], -32602);
    assert!(response["error"]["message"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn test_send_email_between_local_accounts() {
    let mailbox = TestMailbox::with_accounts(&[ME, FRIEND]);
    let mut client = ready_client(&mailbox).await;

    let response = client
        .call_tool(
            "send_email",
            json!({"to": FRIEND, "subject": "Pond meetup", "body": "Saturday at the lake?"}),
        )
        .await;
    assert_eq!(
        content_texts(&response),
        vec![format!("Email sent successfully to {}", FRIEND)]
    );

    assert_eq!(mailbox.message_count(ME, Some(SENT_FOLDER)), 1);
    assert_eq!(mailbox.message_count(FRIEND, None), 1);
    assert_eq!(mailbox.unread_count(FRIEND), 1);

    let response = client
        .call_tool("read_emails", json!({"account": FRIEND, "unread": true}))
        .await;
    let texts = content_texts(&response);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Pond meetup"));
    assert!(texts[0].contains(&format!("From: {}", ME)));
}

#[tokio::test]
async fn test_send_email_validation_is_tool_error() {
    let mailbox = TestMailbox::with_accounts(&[ME]);
    let mut client = ready_client(&mailbox).await;

    let response = client
        .call_tool("send_email", json!({"to": "nobody", "subject": "s", "body": "b"}))
        .await;
    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    assert!(content_texts(&response)[0].contains("invalid email format"));

    let response = client
        .call_tool(
            "send_email",
            json!({"to": FRIEND, "subject": "s", "body": "x".repeat(50_001)}),
        )
        .await;
    assert_eq!(response["result"]["isError"], true);

    // Missing required field is a protocol-level argument error instead
    let response = client.call_tool("send_email", json!({"to": FRIEND})).await;
    assert_eq!(response["error"]["code"], -32602);

    assert_eq!(mailbox.message_count(ME, Some(SENT_FOLDER)), 0);
}

#[tokio::test]
async fn test_get_email_marks_read() {
    let mailbox = TestMailbox::with_accounts(&[ME]);
    let ids = mailbox.seed_inbox(ME, 2);
    let mut client = ready_client(&mailbox).await;
    assert_eq!(mailbox.unread_count(ME), 2);

    let response = client.call_tool("get_email", json!({"id": ids[0]})).await;
    let text = &content_texts(&response)[0];
    assert!(text.contains("Seeded message 0"));
    assert!(text.contains("This is message number 0."));
    assert_eq!(mailbox.unread_count(ME), 1);

    let response = client.call_tool("get_email", json!({"id": 999_999})).await;
    assert_eq!(response["result"]["isError"], true);
}

#[tokio::test]
async fn test_unknown_account_is_tool_error() {
    let mailbox = TestMailbox::with_accounts(&[ME]);
    let mut client = ready_client(&mailbox).await;

    let response = client
        .call_tool("read_emails", json!({"account": "stranger@example.com"}))
        .await;
    assert_eq!(response["result"]["isError"], true);
    assert!(content_texts(&response)[0].contains("account not found"));
}
