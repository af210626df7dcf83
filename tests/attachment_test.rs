//! Attachment tests.

use postageapp::{
    Attachment, AttachmentContent, ErrorKind, Fetcher, FtpFetcher, HttpFetcher, PostageApp,
    PostageError, Projects,
};
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Constructor Tests
// ============================================================================

#[test]
fn from_bytes_creates_attachment() {
    let attachment = Attachment::from_bytes("file.txt", b"content".to_vec());
    assert_eq!(attachment.filename, "file.txt");
    assert_eq!(attachment.content_type, "text/plain");
    assert_eq!(attachment.content, AttachmentContent::Bytes(b"content".to_vec()));
}

#[test]
fn from_url_keeps_location() {
    let attachment = Attachment::from_url("logo.png", "https://cdn.example.com/logo.png");
    assert!(attachment.is_remote());
    assert_eq!(attachment.content_type, "image/png");
    assert_eq!(
        attachment.content,
        AttachmentContent::Remote("https://cdn.example.com/logo.png".into())
    );
}

#[test]
fn from_path_reads_file() {
    let path = std::env::temp_dir().join(format!("postageapp-{}-invoice.csv", std::process::id()));
    std::fs::write(&path, "a,b\n1,2\n").unwrap();

    let attachment = Attachment::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(attachment.filename.ends_with("invoice.csv"));
    assert_eq!(attachment.content_type, "text/csv");
    assert_eq!(attachment.content, AttachmentContent::Bytes(b"a,b\n1,2\n".to_vec()));
}

#[test]
fn from_path_missing_file() {
    let err = Attachment::from_path("/nonexistent/postageapp/report.pdf").unwrap_err();
    assert!(matches!(err, PostageError::AttachmentFileNotFound(_)));
}

// ============================================================================
// Content Type Tests
// ============================================================================

#[test]
fn content_type_is_guessed_from_extension() {
    assert_eq!(Attachment::from_bytes("report.pdf", vec![]).content_type, "application/pdf");
    assert_eq!(Attachment::from_bytes("image.png", vec![]).content_type, "image/png");
    assert_eq!(Attachment::from_bytes("photo.jpg", vec![]).content_type, "image/jpeg");
    assert_eq!(Attachment::from_bytes("archive.zip", vec![]).content_type, "application/zip");
}

#[test]
fn content_type_can_be_overridden() {
    let attachment = Attachment::new("file.txt", "x").content_type("application/msword");
    assert_eq!(attachment.content_type, "application/msword");
}

// ============================================================================
// Encoding Tests
// ============================================================================

#[tokio::test]
async fn literal_content_is_base64_encoded() {
    let encoded = Attachment::new("hello.txt", "hello")
        .encode(&HttpFetcher::new())
        .await
        .unwrap();
    assert_eq!(encoded.content_type, "text/plain");
    assert_eq!(encoded.content, "aGVsbG8=");
}

#[tokio::test]
async fn remote_content_is_fetched_then_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&server)
        .await;

    let attachment = Attachment::new("hello.txt", format!("{}/hello.txt", server.uri()));
    let encoded = attachment.encode(&HttpFetcher::new()).await.unwrap();
    assert_eq!(encoded.content, "aGVsbG8=");
}

// ============================================================================
// Fetcher Tests
// ============================================================================

#[tokio::test]
async fn fetcher_reports_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let location = format!("{}/missing.pdf", server.uri());
    let err = HttpFetcher::new().fetch(&location).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AttachmentFetch);
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn fetcher_downloads_ftp_location() {
    let (port, server) = serve_ftp_file("/reports/q3.csv", b"a,b\n1,2\n");

    let location = format!("ftp://127.0.0.1:{}/reports/q3.csv", port);
    let data = FtpFetcher::new().fetch(&location).await.unwrap();
    assert_eq!(data, b"a,b\n1,2\n");

    let commands = server.join().unwrap();
    assert!(commands.contains(&"USER anonymous".to_string()));
    assert!(commands.contains(&"TYPE I".to_string()));
    assert!(commands.contains(&"RETR /reports/q3.csv".to_string()));
}

#[tokio::test]
async fn fetcher_reports_missing_ftp_file() {
    let (port, server) = serve_ftp_file("/a.txt", b"A");

    let location = format!("ftp://127.0.0.1:{}/b.txt", port);
    let err = FtpFetcher::new().fetch(&location).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AttachmentFetch);
    drop(server);
}

#[tokio::test]
async fn client_attaches_ftp_content_with_default_fetcher() {
    let (port, server) = serve_ftp_file("/a.txt", b"hello");
    let mut client = PostageApp::new(Projects::new().with("main", "key"));

    client
        .set_attachments(json!({
            "filename": "a.txt",
            "content_type": "text/plain",
            "content": format!("ftp://127.0.0.1:{}/a.txt", port)
        }))
        .await
        .map_err(|e| e.to_string())
        .unwrap();

    let attachment = &client.message().attachments["a.txt"];
    assert_eq!(attachment.content_type, "text/plain");
    assert_eq!(attachment.content, "aGVsbG8=");
    server.join().unwrap();
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Serve one FTP control session that offers `contents` at `path` over a
/// passive data connection. Returns the control port and a handle yielding
/// the commands received.
fn serve_ftp_file(path: &'static str, contents: &'static [u8]) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (control, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(control.try_clone().unwrap());
        let mut writer = control;
        let mut commands = Vec::new();
        let mut data_listener: Option<TcpListener> = None;

        reply(&mut writer, "220 Service ready");
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            let line = line.trim_end().to_string();
            commands.push(line.clone());
            let (verb, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));

            match verb {
                "USER" => reply(&mut writer, "331 Password required"),
                "PASS" => reply(&mut writer, "230 Logged in"),
                "TYPE" => reply(&mut writer, "200 Type set"),
                "PASV" => {
                    let data = TcpListener::bind("127.0.0.1:0").unwrap();
                    let data_port = data.local_addr().unwrap().port();
                    data_listener = Some(data);
                    reply(
                        &mut writer,
                        &format!(
                            "227 Entering Passive Mode (127,0,0,1,{},{})",
                            data_port / 256,
                            data_port % 256
                        ),
                    );
                }
                "RETR" if arg == path => {
                    reply(&mut writer, "150 Opening data connection");
                    let (mut data, _) = data_listener.take().unwrap().accept().unwrap();
                    data.write_all(contents).unwrap();
                    drop(data);
                    reply(&mut writer, "226 Transfer complete");
                }
                "RETR" => reply(&mut writer, "550 File not found"),
                "QUIT" => {
                    reply(&mut writer, "221 Goodbye");
                    break;
                }
                _ => reply(&mut writer, "502 Command not implemented"),
            }
        }
        commands
    });

    (port, handle)
}

fn reply(writer: &mut TcpStream, line: &str) {
    let _ = writer.write_all(format!("{}\r\n", line).as_bytes());
}
