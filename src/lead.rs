//! Lead capture for the contact and hire-me forms.
//!
//! A [`LeadForm`] validates the visitor's input, flattens it into the
//! key-value parameters the mail template expects and hands them to a
//! [`MessageSender`]. Progress is observable as a [`SubmissionState`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::{FolioError, Result};

/// Public EmailJS send endpoint.
pub const EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// One message left by a visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadMessage {
    pub from_name: String,
    pub from_email: String,
    pub message: String,
    pub reply_to: String,
    /// RFC 3339 submission time.
    pub submitted_at: String,
    /// Which form the message came from ("contact", "hire-me").
    pub source: String,
}

impl LeadMessage {
    /// Build a message stamped with the current time. Input is trimmed;
    /// replies go to the sender's address.
    pub fn new(
        name: impl AsRef<str>,
        email: impl AsRef<str>,
        message: impl AsRef<str>,
        source: impl Into<String>,
    ) -> Self {
        let from_email = email.as_ref().trim().to_string();
        Self {
            from_name: name.as_ref().trim().to_string(),
            reply_to: from_email.clone(),
            from_email,
            message: message.as_ref().trim().to_string(),
            submitted_at: chrono::Utc::now().to_rfc3339(),
            source: source.into(),
        }
    }

    /// Reject messages that cannot be answered.
    pub fn validate(&self) -> Result<()> {
        if self.from_name.is_empty() {
            return Err(FolioError::InvalidInput("name is required".into()));
        }
        if !is_plausible_email(&self.from_email) {
            return Err(FolioError::InvalidInput(format!(
                "'{}' is not a valid email address",
                self.from_email
            )));
        }
        if self.message.is_empty() {
            return Err(FolioError::InvalidInput("message is required".into()));
        }
        Ok(())
    }

    /// Flat template parameters.
    pub fn to_params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("from_name".to_string(), self.from_name.clone()),
            ("from_email".to_string(), self.from_email.clone()),
            ("message".to_string(), self.message.clone()),
            ("reply_to".to_string(), self.reply_to.clone()),
            ("submitted_at".to_string(), self.submitted_at.clone()),
            ("source".to_string(), self.source.clone()),
        ])
    }
}

/// `local@domain.tld` with no whitespace.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Delivers flattened lead parameters to a mail service.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, params: &BTreeMap<String, String>) -> Result<()>;
}

/// [`MessageSender`] posting to the EmailJS REST API.
#[derive(Debug, Clone)]
pub struct EmailJsSender {
    client: reqwest::Client,
    endpoint: String,
    service_id: String,
    template_id: String,
    public_key: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a BTreeMap<String, String>,
}

impl EmailJsSender {
    pub fn new(config: &EmailConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &EmailConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| EMAILJS_ENDPOINT.to_string()),
            service_id: config.service_id.clone(),
            template_id: config.template_id.clone(),
            public_key: config.public_key.clone(),
        }
    }
}

#[async_trait]
impl MessageSender for EmailJsSender {
    async fn send(&self, params: &BTreeMap<String, String>) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendRequest {
                service_id: &self.service_id,
                template_id: &self.template_id,
                user_id: &self.public_key,
                template_params: params,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FolioError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Where a form submission stands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum SubmissionState {
    #[default]
    Idle,
    Sending,
    Success,
    /// Human-readable reason, safe to show the visitor.
    Error(String),
}

/// One contact form bound to a sender.
pub struct LeadForm {
    sender: Arc<dyn MessageSender>,
    source: String,
    state: watch::Sender<SubmissionState>,
}

impl LeadForm {
    pub fn new(sender: Arc<dyn MessageSender>, source: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            sender,
            source: source.into(),
            state,
        }
    }

    /// Validate and send one message.
    ///
    /// The outcome is also published as the form's [`SubmissionState`].
    /// A second submission while one is in flight is rejected.
    pub async fn submit(&self, name: &str, email: &str, message: &str) -> Result<()> {
        let lead = LeadMessage::new(name, email, message, self.source.clone());
        if let Err(e) = lead.validate() {
            self.state.send_replace(SubmissionState::Error(user_message(&e)));
            return Err(e);
        }

        let started = self.state.send_if_modified(|state| {
            if *state == SubmissionState::Sending {
                return false;
            }
            *state = SubmissionState::Sending;
            true
        });
        if !started {
            return Err(FolioError::InvalidInput(
                "a submission is already in progress".into(),
            ));
        }

        match self.sender.send(&lead.to_params()).await {
            Ok(()) => {
                info!(source = %self.source, "lead message sent");
                self.state.send_replace(SubmissionState::Success);
                Ok(())
            }
            Err(e) => {
                warn!(source = %self.source, status = e.status(), error = %e, "lead message failed");
                self.state.send_replace(SubmissionState::Error(user_message(&e)));
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    /// Stream of state changes, starting with the current state.
    pub fn subscribe(&self) -> WatchStream<SubmissionState> {
        WatchStream::new(self.state.subscribe())
    }

    /// Back to [`SubmissionState::Idle`] unless a send is in flight.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, SubmissionState::Idle | SubmissionState::Sending) {
                return false;
            }
            *state = SubmissionState::Idle;
            true
        });
    }
}

/// Message shown to the visitor for a failed submission.
pub fn user_message(err: &FolioError) -> String {
    match err {
        FolioError::Api { status, message } if message.trim().is_empty() => {
            format!("the mail service rejected the message (status {status})")
        }
        FolioError::Api { message, .. } => message.trim().to_string(),
        FolioError::Http(_) | FolioError::Timeout(_) => {
            "network error, please check your connection and try again".to_string()
        }
        FolioError::InvalidInput(reason) => reason.clone(),
        other => other.to_string(),
    }
}
