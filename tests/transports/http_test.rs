//! HTTP transport tests against a local mock server.

use postageapp::transport::HttpTransport;
use postageapp::{ErrorKind, PostageApp, PostageError, Projects, Transport};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn client_for(server: &MockServer) -> PostageApp {
    PostageApp::new(Projects::new().with("main", "jarvis"))
        .with_transport(HttpTransport::new().base_url(server.uri()))
        .with_project("main")
        .unwrap()
}

fn ok_send_response(uid: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "response": {"status": "ok", "uid": uid},
        "data": {"message": {"id": 12345}}
    }))
}

// ============================================================================
// Envelope Tests
// ============================================================================

#[tokio::test]
async fn posts_json_to_versioned_endpoint() {
    let server = MockServer::start().await;
    let transport = HttpTransport::new().base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/v.1.0/get_metrics.json"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"api_key": "jarvis"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"status": "ok"},
            "data": {"metrics": {}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport
        .call("get_metrics", &json!({"api_key": "jarvis"}))
        .await
        .unwrap();
    assert!(response.is_ok());
    assert_eq!(response.data, Some(json!({"metrics": {}})));
}

#[tokio::test]
async fn error_status_envelope_is_still_parsed() {
    let server = MockServer::start().await;
    let transport = HttpTransport::new().base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/v.1.0/send_message.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "response": {"status": "unauthorized", "message": "Invalid project API key"}
        })))
        .mount(&server)
        .await;

    let response = transport
        .call("send_message", &json!({"api_key": "wrong"}))
        .await
        .unwrap();
    assert!(!response.is_ok());
    assert_eq!(response.response.status, "unauthorized");
}

#[tokio::test]
async fn unparseable_body_is_transport_error() {
    let server = MockServer::start().await;
    let transport = HttpTransport::new().base_url(server.uri());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = transport.call("get_messages", &json!({})).await.unwrap_err();
    assert!(matches!(err, PostageError::Transport(ref msg) if msg.contains("502")));
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let transport = HttpTransport::new()
        .base_url("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2));

    let err = transport.call("get_messages", &json!({})).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

// ============================================================================
// Client Round Trips
// ============================================================================

#[tokio::test]
async fn custom_message_round_trip() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);

    Mock::given(method("POST"))
        .and(path("/v.1.0/send_message.json"))
        .and(body_partial_json(json!({
            "api_key": "jarvis",
            "arguments": {
                "recipients": ["tony.stark@example.com", "steve.rogers@example.com"],
                "uid": "fixed-uid-123",
                "headers": {"Subject": "Hello, Avengers!"},
                "content": {"text/plain": "Hello", "text/html": "<h1>Hello</h1>"}
            }
        })))
        .respond_with(ok_send_response("fixed-uid-123"))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_recipients("tony.stark@example.com,steve.rogers@example.com")
        .unwrap()
        .set_from(("Jarvis", "jarvis@example.com"))
        .set_subject("Hello, Avengers!")
        .set_body_with_html("Hello", "<h1>Hello</h1>");

    let sent = client.send_custom_message(Some("fixed-uid-123")).await.unwrap();
    assert_eq!(sent.uid, "fixed-uid-123");
}

#[tokio::test]
async fn remote_error_round_trip() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);

    Mock::given(method("POST"))
        .and(path("/v.1.0/send_message.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"status": "error", "message": "bad key"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_recipients(["tony.stark@example.com"])
        .unwrap()
        .set_from("jarvis@example.com")
        .set_subject("Hello")
        .set_body("Hello");

    let err = client.send_custom_message(Some("fixed-uid-123")).await.unwrap_err();
    assert_eq!(err.remote_message(), Some("bad key"));
}

#[tokio::test]
async fn validation_failure_never_reaches_server() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);

    Mock::given(method("POST"))
        .respond_with(ok_send_response("never"))
        .expect(0)
        .mount(&server)
        .await;

    client.set_recipients(["tony.stark@example.com"]).unwrap();
    let err = client.send_custom_message(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn message_status_round_trip() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("POST"))
        .and(path("/v.1.0/get_message_transmissions.json"))
        .and(body_json(json!({"api_key": "jarvis", "uid": "abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"status": "ok", "uid": "abc"},
            "data": {
                "message": {"id": 1},
                "transmissions": {"tony.stark@example.com": {"status": "completed"}}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transmissions = client.get_message_status("abc").await.unwrap();
    assert_eq!(
        transmissions["tony.stark@example.com"]["status"],
        json!("completed")
    );
}

// ============================================================================
// Remote Attachment Tests
// ============================================================================

#[tokio::test]
async fn remote_attachment_is_downloaded_and_sent_encoded() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);

    Mock::given(method("GET"))
        .and(path("/files/report.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("assemble"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v.1.0/send_message.json"))
        .and(body_partial_json(json!({
            "arguments": {
                "attachments": {
                    "report.txt": {"content_type": "text/plain", "content": "YXNzZW1ibGU="}
                }
            }
        })))
        .respond_with(ok_send_response("with-file"))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_recipients(["tony.stark@example.com"])
        .unwrap()
        .set_from("jarvis@example.com")
        .set_subject("Report")
        .set_body("See attached");
    client
        .set_attachments(json!({
            "filename": "report.txt",
            "content_type": "text/plain",
            "content": format!("{}/files/report.txt", server.uri())
        }))
        .await
        .unwrap();

    let sent = client.send_custom_message(None).await.unwrap();
    assert_eq!(sent.uid, "with-file");
}
