//! Mail provider transport.
//!
//! Submits composed, base64url-encoded messages to the Gmail send
//! endpoint. Ordinary send failures are values, not errors: the transport
//! only reports an outcome, and the orchestrator logs it per recipient.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::auth::AccessToken;

/// Gmail send endpoint.
pub const SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

/// Provider name recorded on every ledger row.
pub const PROVIDER_NAME: &str = "gmail";

/// Result of one send call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The provider accepted the message.
    Accepted {
        /// Provider-assigned message id, when reported.
        message_id: Option<String>,
    },
    /// The provider refused the message, or it never got there.
    Rejected {
        /// Human-readable reason, from the provider's error payload when
        /// one was parseable.
        reason: String,
    },
}

/// Transport seam for sending composed messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends a base64url-encoded raw message with a bearer token.
    async fn send(&self, token: &AccessToken, raw: &str) -> SendOutcome;
}

/// HTTP transport against the Gmail REST API.
pub struct GmailTransport {
    send_url: String,
    http: reqwest::Client,
}

impl GmailTransport {
    /// Creates a transport against the production send endpoint.
    pub fn new() -> Self {
        GmailTransport {
            send_url: SEND_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Overrides the send endpoint, for tests or a proxy.
    pub fn with_send_url(mut self, url: impl Into<String>) -> Self {
        self.send_url = url.into();
        self
    }
}

impl Default for GmailTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SendResponse {
    id: Option<String>,
}

#[derive(Deserialize)]
struct SendErrorResponse {
    error: Option<SendErrorDetail>,
}

#[derive(Deserialize)]
struct SendErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl MailTransport for GmailTransport {
    async fn send(&self, token: &AccessToken, raw: &str) -> SendOutcome {
        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(token.token.expose_secret())
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                return SendOutcome::Rejected {
                    reason: format!("Send request failed: {err}"),
                }
            }
        };

        if response.status().is_success() {
            let message_id = response
                .json::<SendResponse>()
                .await
                .ok()
                .and_then(|payload| payload.id);
            return SendOutcome::Accepted { message_id };
        }

        let reason = response
            .json::<SendErrorResponse>()
            .await
            .ok()
            .and_then(|payload| payload.error)
            .and_then(|detail| detail.message)
            .unwrap_or_else(|| "Gmail send failed.".to_string());
        SendOutcome::Rejected { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> AccessToken {
        AccessToken::new("tok-123", "Bearer")
    }

    #[tokio::test]
    async fn accepted_send_reports_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer tok-123"))
            .and(body_json(serde_json::json!({ "raw": "ZW5jb2RlZA" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg-789",
                "threadId": "thr-1",
            })))
            .mount(&server)
            .await;

        let transport = GmailTransport::new().with_send_url(format!("{}/send", server.uri()));
        let outcome = transport.send(&token(), "ZW5jb2RlZA").await;
        assert_eq!(
            outcome,
            SendOutcome::Accepted {
                message_id: Some("msg-789".to_string())
            }
        );
    }

    #[tokio::test]
    async fn rejection_surfaces_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "Quota exceeded for sending." }
            })))
            .mount(&server)
            .await;

        let transport = GmailTransport::new().with_send_url(format!("{}/send", server.uri()));
        let outcome = transport.send(&token(), "cmF3").await;
        assert_eq!(
            outcome,
            SendOutcome::Rejected {
                reason: "Quota exceeded for sending.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unparseable_rejection_gets_generic_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream blew up"))
            .mount(&server)
            .await;

        let transport = GmailTransport::new().with_send_url(format!("{}/send", server.uri()));
        let outcome = transport.send(&token(), "cmF3").await;
        assert_eq!(
            outcome,
            SendOutcome::Rejected {
                reason: "Gmail send failed.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_rejected_not_raised() {
        let transport = GmailTransport::new().with_send_url("http://127.0.0.1:1/send");
        match transport.send(&token(), "cmF3").await {
            SendOutcome::Rejected { reason } => assert!(reason.contains("Send request failed")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
