//! Message attachments, literal or fetched from a URL.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::PostageError;
use crate::fetch::Fetcher;
use crate::recipients::json_type;

/// Where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentContent {
    /// Literal content, encoded as-is.
    Bytes(Vec<u8>),
    /// Location to download at send-preparation time.
    Remote(String),
}

/// An attachment waiting to be encoded.
///
/// # Examples
///
/// ```
/// use postageapp::{Attachment, AttachmentContent};
///
/// let notes = Attachment::new("notes.txt", "hello");
/// assert_eq!(notes.content_type, "text/plain");
/// assert_eq!(notes.content, AttachmentContent::Bytes(b"hello".to_vec()));
///
/// // Content starting with "http" or "ftp" is treated as a location.
/// let logo = Attachment::new("logo.png", "https://example.com/logo.png");
/// assert!(logo.is_remote());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Filename; also the key the API stores the attachment under
    pub filename: String,
    /// MIME content type (e.g., "application/pdf")
    pub content_type: String,
    /// Literal data or remote location
    pub content: AttachmentContent,
}

impl Attachment {
    /// Create an attachment from text content.
    ///
    /// Content beginning with `http` or `ftp` is a location to fetch; anything
    /// else is literal data. The content type is guessed from the filename.
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        if is_location(&content) {
            Self::from_url(filename, content)
        } else {
            Self::from_bytes(filename, content.into_bytes())
        }
    }

    /// Create an attachment from raw bytes.
    pub fn from_bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        Self {
            content_type: guess_content_type(&filename),
            filename,
            content: AttachmentContent::Bytes(data),
        }
    }

    /// Create an attachment fetched from `url` when it is added to a message.
    pub fn from_url(filename: impl Into<String>, url: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            content_type: guess_content_type(&filename),
            filename,
            content: AttachmentContent::Remote(url.into()),
        }
    }

    /// Read a local file, naming the attachment after it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PostageError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();

        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PostageError::AttachmentFileNotFound(path.display().to_string())
            } else {
                PostageError::AttachmentReadError(format!("{}: {}", path.display(), e))
            }
        })?;

        Ok(Self::from_bytes(filename, data))
    }

    /// Set the content type explicitly.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.content, AttachmentContent::Remote(_))
    }

    /// Load (fetching if remote) and base64-encode the content.
    pub async fn encode(&self, fetcher: &dyn Fetcher) -> Result<EncodedAttachment, PostageError> {
        let data = match &self.content {
            AttachmentContent::Bytes(data) => data.clone(),
            AttachmentContent::Remote(location) => fetcher.fetch(location).await?,
        };

        Ok(EncodedAttachment {
            content_type: self.content_type.clone(),
            content: base64::engine::general_purpose::STANDARD.encode(&data),
        })
    }
}

/// An attachment in wire form, as stored on the in-progress message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAttachment {
    pub content_type: String,
    /// Base64-encoded content
    pub content: String,
}

fn is_location(content: &str) -> bool {
    content.starts_with("http") || content.starts_with("ftp")
}

fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}

/// Input accepted by [`PostageApp::set_attachments`](crate::PostageApp::set_attachments).
///
/// Besides typed [`Attachment`]s, JSON input is accepted in two shapes:
///
/// - one record: `{"filename": "a.txt", "content_type": "text/plain", "content": "..."}`
/// - a map: `{"a.txt": {"content_type": "text/plain", "content": "..."}, ...}`
pub trait IntoAttachments {
    fn into_attachments(self) -> Result<Vec<Attachment>, PostageError>;
}

impl IntoAttachments for Attachment {
    fn into_attachments(self) -> Result<Vec<Attachment>, PostageError> {
        Ok(vec![self])
    }
}

impl IntoAttachments for Vec<Attachment> {
    fn into_attachments(self) -> Result<Vec<Attachment>, PostageError> {
        if self.is_empty() {
            return Err(PostageError::Validation("attachment list is empty".into()));
        }
        Ok(self)
    }
}

impl IntoAttachments for Value {
    fn into_attachments(self) -> Result<Vec<Attachment>, PostageError> {
        let mut map = match self {
            Value::Object(map) if !map.is_empty() => map,
            other => {
                return Err(PostageError::Validation(format!(
                    "attachments must be a non-empty object, got {}",
                    if other.is_object() { "empty object" } else { json_type(&other) }
                )))
            }
        };

        if let Some(filename) = map.remove("filename") {
            let filename = filename.as_str().map(str::to_string).ok_or_else(|| {
                PostageError::Validation("attachment filename must be a string".into())
            })?;
            return Ok(vec![record(filename, Value::Object(map))?]);
        }

        map.into_iter()
            .map(|(filename, entry)| record(filename, entry))
            .collect()
    }
}

fn record(filename: String, entry: Value) -> Result<Attachment, PostageError> {
    let Value::Object(entry) = entry else {
        return Err(PostageError::Validation(format!(
            "attachment {} must be an object",
            filename
        )));
    };

    let content = entry
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            PostageError::Validation(format!("attachment {} has no string content", filename))
        })?;
    let mut attachment = Attachment::new(filename.clone(), content);

    match entry.get("content_type") {
        Some(Value::String(ct)) => attachment = attachment.content_type(ct.as_str()),
        None | Some(Value::Null) => {}
        Some(_) => {
            return Err(PostageError::Validation(format!(
                "attachment {} content_type must be a string",
                filename
            )))
        }
    }
    Ok(attachment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_classifies_by_prefix() {
        assert!(!Attachment::new("a.txt", "hello").is_remote());
        assert!(Attachment::new("a.txt", "http://example.com/a.txt").is_remote());
        assert!(Attachment::new("a.txt", "https://example.com/a.txt").is_remote());
        assert!(Attachment::new("a.txt", "ftp://example.com/a.txt").is_remote());
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(Attachment::new("doc.pdf", "x").content_type, "application/pdf");
        assert_eq!(
            Attachment::from_bytes("blob.unknown_ext_12345", vec![]).content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_single_record_json() {
        let list = json!({"filename": "f.txt", "content_type": "text/x-log", "content": "hello"})
            .into_attachments()
            .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].filename, "f.txt");
        assert_eq!(list[0].content_type, "text/x-log");
        assert_eq!(list[0].content, AttachmentContent::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn test_map_json() {
        let list = json!({
            "a.txt": {"content_type": "text/plain", "content": "A"},
            "b.png": {"content": "https://cdn.example.com/b.png"}
        })
        .into_attachments()
        .unwrap();
        assert_eq!(list.len(), 2);
        let b = list.iter().find(|a| a.filename == "b.png").unwrap();
        assert_eq!(b.content_type, "image/png");
        assert!(b.is_remote());
    }

    #[test]
    fn test_invalid_json_shapes() {
        assert!(matches!(
            json!({}).into_attachments(),
            Err(PostageError::Validation(_))
        ));
        assert!(json!("file.txt").into_attachments().is_err());
        assert!(json!({"a.txt": "raw"}).into_attachments().is_err());
        assert!(json!({"filename": "a.txt"}).into_attachments().is_err());
        assert!(Vec::<Attachment>::new().into_attachments().is_err());
    }
}
