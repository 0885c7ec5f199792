//! Lead capture against a mocked EmailJS endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use folio::config::EmailConfig;
use folio::{EmailJsSender, FolioError, LeadForm, MessageSender, Result, SubmissionState};
use serde_json::json;
use tokio::sync::Notify;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn email_config(endpoint: String) -> EmailConfig {
    EmailConfig {
        service_id: "service_x".into(),
        template_id: "template_y".into(),
        public_key: "pk_z".into(),
        endpoint: Some(endpoint),
    }
}

fn form_for(server: &MockServer) -> LeadForm {
    let config = email_config(format!("{}/api/v1.0/email/send", server.uri()));
    LeadForm::new(Arc::new(EmailJsSender::new(&config)), "contact")
}

#[tokio::test]
async fn submit_posts_template_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1.0/email/send"))
        .and(body_partial_json(json!({
            "service_id": "service_x",
            "template_id": "template_y",
            "user_id": "pk_z",
            "template_params": {
                "from_name": "Ada",
                "from_email": "ada@example.com",
                "reply_to": "ada@example.com",
                "message": "Let's talk",
                "source": "contact",
            },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let form = form_for(&server);
    form.submit(" Ada ", "ada@example.com", "Let's talk")
        .await
        .expect("submission should succeed");
    assert_eq!(form.state(), SubmissionState::Success);

    form.reset();
    assert_eq!(form.state(), SubmissionState::Idle);
}

#[tokio::test]
async fn rejected_message_surfaces_service_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("The template ID is invalid"))
        .expect(1)
        .mount(&server)
        .await;

    let form = form_for(&server);
    let err = form
        .submit("Ada", "ada@example.com", "hello")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(
        form.state(),
        SubmissionState::Error("The template ID is invalid".into())
    );
}

#[tokio::test]
async fn invalid_input_never_reaches_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let form = form_for(&server);
    let err = form.submit("Ada", "not-an-email", "hello").await.unwrap_err();

    assert!(matches!(err, FolioError::InvalidInput(_)));
    match form.state() {
        SubmissionState::Error(reason) => assert!(reason.contains("not-an-email")),
        other => panic!("expected Error state, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    let config = email_config("http://127.0.0.1:1/send".into());
    let form = LeadForm::new(Arc::new(EmailJsSender::new(&config)), "hire-me");

    let err = form
        .submit("Ada", "ada@example.com", "hello")
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(
        form.state(),
        SubmissionState::Error("network error, please check your connection and try again".into())
    );
}

/// Sender that blocks until released.
struct GatedSender {
    release: Notify,
    entered: Notify,
}

#[async_trait]
impl MessageSender for GatedSender {
    async fn send(&self, _params: &BTreeMap<String, String>) -> Result<()> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn concurrent_submission_is_rejected() {
    let sender = Arc::new(GatedSender {
        release: Notify::new(),
        entered: Notify::new(),
    });
    let form = Arc::new(LeadForm::new(sender.clone(), "contact"));

    let first = {
        let form = form.clone();
        tokio::spawn(async move { form.submit("Ada", "ada@example.com", "one").await })
    };
    sender.entered.notified().await;
    assert_eq!(form.state(), SubmissionState::Sending);

    let err = form
        .submit("Ada", "ada@example.com", "two")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already in progress"));

    // reset is ignored while a send is in flight
    form.reset();
    assert_eq!(form.state(), SubmissionState::Sending);

    sender.release.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(form.state(), SubmissionState::Success);
}

#[test]
fn submission_state_serialises_with_a_tag() {
    assert_eq!(
        serde_json::to_value(SubmissionState::Sending).unwrap(),
        json!({"state": "sending"})
    );
    assert_eq!(
        serde_json::to_value(SubmissionState::Error("boom".into())).unwrap(),
        json!({"state": "error", "error": "boom"})
    );
}
