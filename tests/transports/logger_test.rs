//! Logger transport tests.

use postageapp::transport::LoggerTransport;
use postageapp::{PostageApp, Projects};
use serde_json::json;

fn client(transport: LoggerTransport) -> PostageApp {
    PostageApp::new(Projects::new().with("staging", "key"))
        .with_transport(transport)
        .with_project("staging")
        .unwrap()
}

#[tokio::test]
async fn custom_send_succeeds_without_network() {
    let mut client = client(LoggerTransport::new());
    client
        .set_recipients("tony.stark@example.com,steve.rogers@example.com")
        .unwrap()
        .set_from("jarvis@example.com")
        .set_subject("Hello, Avengers!")
        .set_body("Hello!");

    let sent = client.send_custom_message(Some("dry-run-1")).await.unwrap();
    assert_eq!(sent.uid, "dry-run-1");
}

#[tokio::test]
async fn template_send_with_full_logging_succeeds() {
    let mut client = client(LoggerTransport::full());
    client
        .set_recipients_with_vars(json!({"tony.stark@example.com": {"name": "Tony"}}))
        .unwrap()
        .set_template("welcome");

    let sent = client.send_template_message(None).await.unwrap();
    assert!(!sent.uid.is_empty());
}

#[tokio::test]
async fn receipt_query_reports_ok() {
    let client = client(LoggerTransport::new());
    assert_eq!(client.get_message_receipt("abc").await.unwrap(), "ok");
}
