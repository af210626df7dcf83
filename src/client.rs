//! The PostageApp client: project selection, message assembly and API calls.

use chrono::Utc;
use serde_json::{json, Value};
use std::env;
use std::sync::Arc;
use tracing::Instrument;

#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::address::ToAddress;
use crate::attachment::IntoAttachments;
use crate::config::Projects;
use crate::error::PostageError;
use crate::fetch::{DefaultFetcher, Fetcher};
use crate::message::Message;
use crate::recipients::{self, IntoRecipientList, Recipients};
use crate::transport::{ApiResponse, HttpTransport, SendResult, Transport};

/// Client for one PostageApp account table.
///
/// Holds the credential table, the selected project and the message being
/// assembled. Setters mutate in place and chain; fallible setters return
/// `Result<&mut Self, _>` so a chain continues with `?`.
///
/// One client assembles one message at a time. Use a client per concurrent
/// sender.
///
/// ```rust,ignore
/// use postageapp::{PostageApp, Projects};
///
/// let mut client = PostageApp::new(Projects::new().with("main", "API_KEY"));
/// client.select_project("main")?;
/// client
///     .set_recipients("ana@example.com,ben@example.com")?
///     .set_from(("Billing", "billing@example.com"))
///     .set_subject("Your invoice")
///     .set_body("Thanks for your order.");
///
/// let sent = client.send_custom_message(None).await?;
/// let transmissions = client.get_message_status(&sent.uid).await?;
/// ```
pub struct PostageApp {
    projects: Projects,
    project: Option<String>,
    api_key: Option<String>,
    message: Message,
    transport: Arc<dyn Transport>,
    fetcher: Arc<dyn Fetcher>,
}

impl PostageApp {
    /// Create a client over `projects` using the HTTP transport and the
    /// default (HTTP and FTP) attachment fetcher.
    ///
    /// No project is selected yet.
    pub fn new(projects: Projects) -> Self {
        Self {
            projects,
            project: None,
            api_key: None,
            message: Message::new(),
            transport: Arc::new(HttpTransport::new()),
            fetcher: Arc::new(DefaultFetcher::new()),
        }
    }

    /// Create a client from environment variables.
    ///
    /// Projects come from `POSTAGEAPP_PROJECTS` / `POSTAGEAPP_API_KEY`, the API
    /// host from `POSTAGEAPP_BASE_URL`. `POSTAGEAPP_PROJECT` names the project
    /// to select; with a single configured project that one is selected.
    pub fn from_env() -> Result<Self, PostageError> {
        let projects = Projects::from_env()?;

        let mut transport = HttpTransport::new();
        if let Ok(url) = env::var("POSTAGEAPP_BASE_URL") {
            transport = transport.base_url(url);
        }

        let mut client = Self::new(projects).with_transport(transport);
        match env::var("POSTAGEAPP_PROJECT") {
            Ok(name) => {
                client.select_project(&name)?;
            }
            Err(_) => {
                let only = match client.projects.names().as_slice() {
                    [only] => Some(only.to_string()),
                    _ => None,
                };
                if let Some(only) = only {
                    client.select_project(&only)?;
                }
            }
        }
        Ok(client)
    }

    /// Select a project while building the client.
    pub fn with_project(mut self, name: &str) -> Result<Self, PostageError> {
        self.select_project(name)?;
        Ok(self)
    }

    /// Replace the transport.
    pub fn with_transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Replace the transport with a shared one.
    pub fn with_transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the attachment fetcher.
    pub fn with_fetcher<F: Fetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Configured project names, in configuration order. No network call.
    pub fn list_projects(&self) -> Vec<&str> {
        self.projects.names()
    }

    /// The configured project table.
    pub fn projects(&self) -> &Projects {
        &self.projects
    }

    /// Name of the selected project.
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Select the project subsequent calls are made under.
    ///
    /// On success the in-progress message is cleared. An unknown name returns
    /// [`PostageError::UnknownProject`] and leaves the client untouched.
    pub fn select_project(&mut self, name: &str) -> Result<&mut Self, PostageError> {
        let key = self
            .projects
            .get(name)
            .ok_or_else(|| PostageError::UnknownProject(name.to_string()))?
            .to_string();

        tracing::debug!(project = %name, "Selected PostageApp project");
        self.project = Some(name.to_string());
        self.api_key = Some(key);
        self.message = Message::new();
        Ok(self)
    }

    // =========================================================================
    // Message Assembly
    // =========================================================================

    /// The message being assembled.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Clear the in-progress message, keeping the selected project.
    pub fn reset_message(&mut self) -> &mut Self {
        self.message = Message::new();
        self
    }

    /// Set the recipient list from a sequence or a comma separated string.
    ///
    /// ```rust,ignore
    /// client.set_recipients(["a@example.com", "b@example.com"])?;
    /// client.set_recipients("a@example.com,b@example.com")?; // same result
    /// client.set_recipients("a@example.com")?;               // Validation error
    /// ```
    pub fn set_recipients(
        &mut self,
        recipients: impl IntoRecipientList,
    ) -> Result<&mut Self, PostageError> {
        let list = recipients.into_recipient_list()?;
        self.message.recipients = Some(Recipients::List(list));
        Ok(self)
    }

    /// Set the subject line.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.message.subject = Some(subject.into());
        self
    }

    /// Set the sender. Accepts `"email"` or `("Name", "email")`.
    pub fn set_from(&mut self, from: impl ToAddress) -> &mut Self {
        self.message.from = Some(from.to_address().formatted());
        self
    }

    /// Set the reply-to address. Defaults to the sender on custom sends.
    pub fn set_reply_to(&mut self, reply_to: impl ToAddress) -> &mut Self {
        self.message.reply_to = Some(reply_to.to_address().formatted());
        self
    }

    /// Replace the extra headers.
    pub fn set_header<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.message.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Add one extra header.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.message.headers.insert(name.into(), value.into());
        self
    }

    /// Set the plain body; the HTML body mirrors it.
    pub fn set_body(&mut self, plain: impl Into<String>) -> &mut Self {
        let plain = plain.into();
        self.message.html_body = Some(plain.clone());
        self.message.text_body = Some(plain);
        self
    }

    /// Set distinct plain and HTML bodies.
    pub fn set_body_with_html(
        &mut self,
        plain: impl Into<String>,
        html: impl Into<String>,
    ) -> &mut Self {
        self.message.text_body = Some(plain.into());
        self.message.html_body = Some(html.into());
        self
    }

    /// Set the slug of a template stored in PostageApp.
    pub fn set_template(&mut self, slug: impl Into<String>) -> &mut Self {
        self.message.template = Some(slug.into());
        self
    }

    /// Set global template variables from a JSON object.
    ///
    /// Null, `""` or `{}` clear them; any other non-object is a validation error.
    pub fn set_global_vars(&mut self, vars: impl Into<Value>) -> Result<&mut Self, PostageError> {
        self.message.variables = recipients::parse_global_vars(vars.into())?.unwrap_or_default();
        Ok(self)
    }

    /// Merge per-recipient variables from `{address: {name: value}}`.
    ///
    /// Variables merge by address and name, so repeated calls accumulate.
    /// Null, `""` or `{}` clear both the recipients and the global variables.
    pub fn set_recipients_with_vars(
        &mut self,
        recipients: impl Into<Value>,
    ) -> Result<&mut Self, PostageError> {
        match recipients::parse_recipient_vars(recipients.into())? {
            Some(incoming) => self
                .message
                .recipients
                .get_or_insert_with(|| Recipients::WithVars(Default::default()))
                .merge_vars(incoming),
            None => {
                self.message.recipients = None;
                self.message.variables.clear();
            }
        }
        Ok(self)
    }

    /// Encode and add attachments, fetching remote content first.
    ///
    /// Entries replace earlier ones with the same filename. If any fetch fails
    /// nothing is added.
    pub async fn set_attachments(
        &mut self,
        attachments: impl IntoAttachments,
    ) -> Result<&mut Self, PostageError> {
        let attachments = attachments.into_attachments()?;

        let mut encoded = Vec::with_capacity(attachments.len());
        for attachment in &attachments {
            encoded.push((
                attachment.filename.clone(),
                attachment.encode(self.fetcher.as_ref()).await?,
            ));
        }
        self.message.attachments.extend(encoded);
        Ok(self)
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Send the assembled message with its own subject and body.
    ///
    /// Reply-to falls back to the sender. Recipients, sender, subject and a
    /// body are required; missing ones fail before any network call. Without
    /// `uid`, one is derived from the recipients and the current time.
    pub async fn send_custom_message(
        &mut self,
        uid: Option<&str>,
    ) -> Result<SendResult, PostageError> {
        let api_key = self.api_key()?.to_string();

        if self.message.reply_to.is_none() && self.message.from.is_some() {
            self.message.reply_to = self.message.from.clone();
        }

        let arguments = self
            .message
            .custom_arguments(uid, Utc::now().timestamp())?;
        let uid = arguments.uid.clone();
        let arguments = serde_json::to_value(&arguments)?;
        let payload = json!({ "api_key": api_key, "arguments": arguments });

        self.deliver(payload, uid).await
    }

    /// Send the assembled message rendered from its template.
    ///
    /// Recipients and a template are required. Without `uid`, one is derived
    /// from the recipient structure and the current time.
    pub async fn send_template_message(
        &mut self,
        uid: Option<&str>,
    ) -> Result<SendResult, PostageError> {
        let api_key = self.api_key()?.to_string();

        let arguments = self
            .message
            .template_arguments(uid, Utc::now().timestamp())?;
        let uid = arguments.uid.clone();
        let arguments = serde_json::to_value(&arguments)?;
        let payload = json!({ "api_key": api_key, "arguments": arguments });

        self.deliver(payload, uid).await
    }

    async fn deliver(&self, payload: Value, uid: String) -> Result<SendResult, PostageError> {
        let response = self.post("send_message", payload).await?;
        let uid = response.response.uid.clone().unwrap_or(uid);
        tracing::info!(uid = %uid, project = ?self.project, "Message accepted");
        Ok(SendResult { uid, response })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check that a message with `uid` was received. Returns the response status.
    pub async fn get_message_receipt(&self, uid: &str) -> Result<String, PostageError> {
        let response = self.query("get_message_receipt", Some(uid)).await?;
        Ok(response.response.status)
    }

    /// Recently sent messages (`data`).
    pub async fn get_messages(&self) -> Result<Value, PostageError> {
        let response = self.query("get_messages", None).await?;
        response
            .data
            .ok_or_else(|| PostageError::UnexpectedResponse("data".into()))
    }

    /// Per-recipient delivery status of a message (`data.transmissions`).
    pub async fn get_message_status(&self, uid: &str) -> Result<Value, PostageError> {
        let response = self.query("get_message_transmissions", Some(uid)).await?;
        take_data(response, "/transmissions")
    }

    /// Delivery metrics of the project (`data.metrics`).
    pub async fn get_metrics(&self) -> Result<Value, PostageError> {
        let response = self.query("get_metrics", None).await?;
        take_data(response, "/metrics")
    }

    /// Account details (`data.account`).
    pub async fn get_account_info(&self) -> Result<Value, PostageError> {
        let response = self.query("get_account_info", None).await?;
        take_data(response, "/account")
    }

    /// Project details (`data.project`).
    pub async fn get_project_info(&self) -> Result<Value, PostageError> {
        let response = self.query("get_project_info", None).await?;
        take_data(response, "/project")
    }

    /// API methods available to the project (`data.methods`).
    pub async fn get_method_list(&self) -> Result<Value, PostageError> {
        let response = self.query("get_method_list", None).await?;
        take_data(response, "/methods")
    }

    async fn query(
        &self,
        method: &'static str,
        uid: Option<&str>,
    ) -> Result<ApiResponse, PostageError> {
        let api_key = self.api_key()?;
        let mut payload = json!({ "api_key": api_key });
        if let Some(uid) = uid {
            payload["uid"] = Value::String(uid.to_string());
        }
        self.post(method, payload).await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn api_key(&self) -> Result<&str, PostageError> {
        self.api_key.as_deref().ok_or(PostageError::ProjectNotSet)
    }

    /// Run one API call and fold a non-`ok` status into an error.
    async fn post(&self, method: &'static str, payload: Value) -> Result<ApiResponse, PostageError> {
        let transport = self.transport.transport_name();
        let span = tracing::info_span!(
            "postageapp.call",
            method = method,
            project = self.project.as_deref().unwrap_or_default(),
            transport = transport,
        );

        async move {
            tracing::debug!("Calling PostageApp API");

            #[cfg(feature = "metrics")]
            let start = Instant::now();

            let result = self
                .transport
                .call(method, &payload)
                .await
                .and_then(ApiResponse::into_result);

            #[cfg(feature = "metrics")]
            {
                let duration = start.elapsed().as_secs_f64();
                let status = if result.is_ok() { "success" } else { "error" };
                metrics::counter!("postageapp_requests_total", "method" => method, "status" => status)
                    .increment(1);
                metrics::histogram!("postageapp_request_duration_seconds", "method" => method)
                    .record(duration);
            }

            if let Err(e) = &result {
                tracing::error!(error = %e, "PostageApp API call failed");
            }
            result
        }
        .instrument(span)
        .await
    }
}

fn take_data(response: ApiResponse, pointer: &str) -> Result<Value, PostageError> {
    response
        .data
        .and_then(|mut data| data.pointer_mut(pointer).map(Value::take))
        .ok_or_else(|| {
            PostageError::UnexpectedResponse(format!("data{}", pointer.replace('/', ".")))
        })
}
