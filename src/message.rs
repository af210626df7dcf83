//! The message being assembled and its `send_message` arguments.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::attachment::EncodedAttachment;
use crate::error::PostageError;
use crate::recipients::{Recipients, Variables};

/// Fields of the message currently being assembled.
///
/// All fields start empty and are filled through the
/// [`PostageApp`](crate::PostageApp) setters. Selecting a project resets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Recipients (plain list or keyed with variables)
    pub recipients: Option<Recipients>,
    /// Sender, formatted as `Name <email>` or `email`
    pub from: Option<String>,
    /// Reply-to address
    pub reply_to: Option<String>,
    /// Subject line
    pub subject: Option<String>,
    /// Plain text body
    pub text_body: Option<String>,
    /// HTML body
    pub html_body: Option<String>,
    /// Extra headers merged into every send
    pub headers: BTreeMap<String, String>,
    /// Server-side template slug
    pub template: Option<String>,
    /// Global template variables
    pub variables: Variables,
    /// Encoded attachments keyed by filename
    pub attachments: BTreeMap<String, EncodedAttachment>,
}

/// `arguments` object of a `send_message` request.
#[derive(Debug, Serialize)]
pub(crate) struct SendArguments<'a> {
    pub recipients: &'a Recipients,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<&'a str, &'a str>,
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<&'a Variables>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<&'a BTreeMap<String, EncodedAttachment>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content<'a> {
    #[serde(rename = "text/plain", skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(rename = "text/html", skip_serializing_if = "Option::is_none")]
    pub html: Option<&'a str>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build arguments for a message carrying its own body.
    ///
    /// Requires recipients, sender, reply-to, subject and at least one body.
    /// Empty strings count as unset. Without a caller uid, one is derived from
    /// the recipient addresses and `timestamp`.
    pub(crate) fn custom_arguments(
        &self,
        uid: Option<&str>,
        timestamp: i64,
    ) -> Result<SendArguments<'_>, PostageError> {
        let recipients = self
            .recipients
            .as_ref()
            .filter(|r| !r.is_empty())
            .ok_or(PostageError::MissingField("recipients"))?;
        let from = present(&self.from).ok_or(PostageError::MissingField("from"))?;
        let reply_to = present(&self.reply_to).ok_or(PostageError::MissingField("reply_to"))?;
        let subject = present(&self.subject).ok_or(PostageError::MissingField("subject"))?;

        let text = present(&self.text_body);
        let html = present(&self.html_body);
        if text.is_none() && html.is_none() {
            return Err(PostageError::MissingField("body"));
        }

        let mut headers = self.extra_headers();
        headers.insert("From", from);
        headers.insert("Reply-to", reply_to);
        headers.insert("Subject", subject);

        let uid = match uid {
            Some(uid) => uid.to_string(),
            None => derive_uid(recipients.addresses().concat().as_bytes(), timestamp),
        };

        Ok(SendArguments {
            recipients,
            headers,
            uid,
            template: None,
            content: Some(Content { text, html }),
            variables: self.variables_arg(),
            attachments: self.attachments_arg(),
        })
    }

    /// Build arguments for a message rendered from a server-side template.
    ///
    /// Requires recipients and a template slug. From/Reply-to headers are only
    /// sent when set. Without a caller uid, one is derived from the serialized
    /// recipient structure and `timestamp`.
    pub(crate) fn template_arguments(
        &self,
        uid: Option<&str>,
        timestamp: i64,
    ) -> Result<SendArguments<'_>, PostageError> {
        let recipients = self
            .recipients
            .as_ref()
            .filter(|r| !r.is_empty())
            .ok_or(PostageError::MissingField("recipients"))?;
        let template = present(&self.template).ok_or(PostageError::MissingField("template"))?;

        let mut headers = self.extra_headers();
        if let Some(from) = present(&self.from) {
            headers.insert("From", from);
        }
        if let Some(reply_to) = present(&self.reply_to) {
            headers.insert("Reply-to", reply_to);
        }

        let uid = match uid {
            Some(uid) => uid.to_string(),
            None => derive_uid(serde_json::to_string(recipients)?.as_bytes(), timestamp),
        };

        Ok(SendArguments {
            recipients,
            headers,
            uid,
            template: Some(template),
            content: None,
            variables: self.variables_arg(),
            attachments: self.attachments_arg(),
        })
    }

    fn extra_headers(&self) -> BTreeMap<&str, &str> {
        self.headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    fn variables_arg(&self) -> Option<&Variables> {
        (!self.variables.is_empty()).then_some(&self.variables)
    }

    fn attachments_arg(&self) -> Option<&BTreeMap<String, EncodedAttachment>> {
        (!self.attachments.is_empty()).then_some(&self.attachments)
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Hex SHA-256 of `seed` followed by the Unix `timestamp`.
///
/// Identical sends made at different seconds get different uids; pass an
/// explicit uid to make a retry deduplicate server-side.
pub fn derive_uid(seed: &[u8], timestamp: i64) -> String {
    format!("{}{}", hex::encode(Sha256::digest(seed)), timestamp)
}
