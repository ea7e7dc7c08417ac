//! Delivery orchestration.
//!
//! One run covers one event: resolve recipients, render a personalized
//! certificate, compose and send the message, and record exactly one
//! ledger row per recipient. Recipients are processed strictly
//! sequentially; per-recipient failures are absorbed into their rows,
//! while run-level faults (missing event, token exchange) propagate after
//! the rows written so far are durable.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::assets::AssetLoader;
use crate::auth::{AccessToken, OAuth2TokenProvider, TokenProvider};
use crate::compose::{body_html, certificate_link, EmailAttachment, MessageComposer};
use crate::config::MailerConfig;
use crate::errors::{ConfigError, DeliveryError, DeliveryResult};
use crate::ledger::DeliveryLedger;
use crate::render::{CertificateRenderer, DocumentRenderer, ResolvedAssets};
use crate::stores::{AttendeeStore, EventStore, SignatureDirectory};
use crate::transport::{GmailTransport, MailTransport, SendOutcome, PROVIDER_NAME};
use crate::types::{
    normalize_email, Attendee, CertificateFields, DeliveryAttempt, DeliveryBatchSummary,
    DeliveryStatus, Event,
};

/// Skip reason recorded when a recipient already has a `sent` row.
pub const REASON_ALREADY_SENT: &str = "already_sent";

/// Skip reason recorded on dry runs.
pub const REASON_DRY_RUN: &str = "dry_run";

/// Failure reason recorded when OAuth credentials are not configured.
pub const REASON_CREDENTIALS_MISSING: &str = "credentials missing";

/// Coverage of an event's attendee list by successful deliveries.
///
/// Read-only audit over the ledger: which attendee emails still have no
/// `sent` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageReport {
    /// Event the report covers.
    pub event_id: String,
    /// Distinct attendee emails (normalized, non-empty).
    pub total_recipients: usize,
    /// Recipients with at least one `sent` row.
    pub sent: usize,
    /// Recipients with no `sent` row, in attendee order.
    pub missing: Vec<String>,
}

/// Top-level certificate delivery orchestrator.
pub struct CertificateMailer {
    config: MailerConfig,
    events: Arc<dyn EventStore>,
    attendees: Arc<dyn AttendeeStore>,
    signatures: Arc<dyn SignatureDirectory>,
    ledger: Arc<dyn DeliveryLedger>,
    token_provider: Arc<dyn TokenProvider>,
    transport: Arc<dyn MailTransport>,
    renderer: Arc<dyn DocumentRenderer>,
    assets: AssetLoader,
    composer: MessageComposer,
}

impl CertificateMailer {
    /// Creates a mailer over the given collaborators with the production
    /// token provider, transport, and renderer.
    pub fn new(
        config: MailerConfig,
        events: Arc<dyn EventStore>,
        attendees: Arc<dyn AttendeeStore>,
        signatures: Arc<dyn SignatureDirectory>,
        ledger: Arc<dyn DeliveryLedger>,
    ) -> Self {
        let composer = MessageComposer::new(&config);
        CertificateMailer {
            config,
            events,
            attendees,
            signatures,
            ledger,
            token_provider: Arc::new(OAuth2TokenProvider::new()),
            transport: Arc::new(GmailTransport::new()),
            renderer: Arc::new(CertificateRenderer::new()),
            assets: AssetLoader::new(),
            composer,
        }
    }

    /// Replaces the token provider.
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = provider;
        self
    }

    /// Replaces the mail transport.
    pub fn with_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replaces the document renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Delivers certificates for an event.
    ///
    /// With `recipient_emails`, only attendees whose normalized email is
    /// in the list are processed. Without it, attendees who already have a
    /// `sent` row are skipped with a ledger row and no send. `dry_run`
    /// walks the full pipeline without rendering or transmitting.
    pub async fn deliver_certificates(
        &self,
        event_id: &str,
        recipient_emails: Option<&[String]>,
        dry_run: bool,
    ) -> DeliveryResult<DeliveryBatchSummary> {
        if self.config.app_url.is_empty() {
            return Err(ConfigError::Invalid(
                "application base URL is not configured".to_string(),
            )
            .into());
        }

        let event = self
            .events
            .event(event_id)
            .await?
            .ok_or_else(|| DeliveryError::EventNotFound(event_id.to_string()))?;
        let registration_id = event
            .registration_id()
            .ok_or_else(|| DeliveryError::MissingRegistrationId(event_id.to_string()))?
            .to_string();
        let attendees = self.attendees.attendees_for_event(event_id).await?;

        let started = Utc::now();
        let sent_at = started.to_rfc3339_opts(SecondsFormat::Millis, true);
        let batch_id = format!("{}_{}", event.id, started.timestamp_millis());
        let subject = event
            .email_subject
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.config.default_subject.clone());

        let signature_reference = if event.ace_coordinator_name.is_empty() {
            None
        } else {
            self.signatures.signature_for(&event.ace_coordinator_name).await?
        };

        let recipient_filter: Option<HashSet<String>> = recipient_emails
            .map(|list| list.iter().map(|e| normalize_email(e)).collect());

        // Read-before-write: one sent-set query per run, not per recipient.
        let already_sent = match &recipient_filter {
            Some(_) => HashSet::new(),
            None => self.ledger.sent_emails(event_id).await?,
        };

        let mut summary = DeliveryBatchSummary::new(batch_id.clone());
        let mut run_token: Option<AccessToken> = None;

        tracing::info!(
            event_id,
            batch_id = %batch_id,
            attendees = attendees.len(),
            dry_run,
            explicit_list = recipient_filter.is_some(),
            "starting certificate delivery run"
        );

        for attendee in &attendees {
            let email = normalize_email(&attendee.email);
            if email.is_empty() {
                continue;
            }
            if let Some(filter) = &recipient_filter {
                if !filter.contains(&email) {
                    continue;
                }
            }
            if recipient_filter.is_none() && already_sent.contains(&email) {
                self.ledger
                    .append(DeliveryAttempt {
                        event_id: attendee.event_id.clone(),
                        attendee_id: attendee.id.clone(),
                        email: email.clone(),
                        subject: subject.clone(),
                        body: "Skipped duplicate send.".to_string(),
                        link: String::new(),
                        status: DeliveryStatus::Skipped,
                        provider: PROVIDER_NAME.to_string(),
                        provider_message_id: None,
                        error: Some(REASON_ALREADY_SENT.to_string()),
                        sent_at: sent_at.clone(),
                        batch_id: batch_id.clone(),
                    })
                    .await?;
                summary.skipped += 1;
                tracing::info!(email = %email, "skipping recipient with prior successful delivery");
                continue;
            }

            summary.attempted += 1;

            let link = certificate_link(&self.config.app_url, &registration_id, attendee);
            let body = self.composer.body_text(&event, attendee, &link);

            let mut status = DeliveryStatus::Sent;
            let mut error: Option<String> = None;
            let mut provider_message_id: Option<String> = None;

            if dry_run {
                status = DeliveryStatus::Skipped;
                error = Some(REASON_DRY_RUN.to_string());
                summary.skipped += 1;
            } else if !self.config.credentials_configured() {
                status = DeliveryStatus::Failed;
                error = Some(REASON_CREDENTIALS_MISSING.to_string());
                summary.failed += 1;
            } else {
                // One exchange per run, on the first recipient that needs it.
                // A failed exchange aborts the rest of the run.
                let token = match &run_token {
                    Some(token) => token.clone(),
                    None => {
                        let token = match self.token_provider.exchange(&self.config).await {
                            Ok(token) => token,
                            Err(err) => {
                                tracing::error!(
                                    batch_id = %batch_id,
                                    error = %err,
                                    "token exchange failed, aborting remainder of run"
                                );
                                return Err(err.into());
                            }
                        };
                        run_token = Some(token.clone());
                        token
                    }
                };

                let attachment = self
                    .render_attachment(&event, attendee, signature_reference.clone(), &email)
                    .await;
                let html = body_html(&body, &link);
                let composed =
                    self.composer.compose(&email, &subject, &body, &html, attachment.as_ref());

                match self.transport.send(&token, &composed.raw).await {
                    SendOutcome::Accepted { message_id } => {
                        provider_message_id = message_id;
                        summary.sent += 1;
                    }
                    SendOutcome::Rejected { reason } => {
                        status = DeliveryStatus::Failed;
                        error = Some(reason);
                        summary.failed += 1;
                    }
                }
            }

            tracing::info!(
                email = %email,
                status = ?status,
                message_id = provider_message_id.as_deref().unwrap_or(""),
                reason = error.as_deref().unwrap_or(""),
                "recorded delivery attempt"
            );

            self.ledger
                .append(DeliveryAttempt {
                    event_id: attendee.event_id.clone(),
                    attendee_id: attendee.id.clone(),
                    email,
                    subject: subject.clone(),
                    body,
                    link,
                    status,
                    provider: PROVIDER_NAME.to_string(),
                    provider_message_id,
                    error,
                    sent_at: sent_at.clone(),
                    batch_id: batch_id.clone(),
                })
                .await?;
        }

        tracing::info!(
            batch_id = %summary.batch_id,
            attempted = summary.attempted,
            sent = summary.sent,
            failed = summary.failed,
            skipped = summary.skipped,
            "certificate delivery run finished"
        );

        Ok(summary)
    }

    /// Renders the certificate for one recipient, degrading to no
    /// attachment when rendering fails.
    async fn render_attachment(
        &self,
        event: &Event,
        attendee: &Attendee,
        signature_reference: Option<String>,
        email: &str,
    ) -> Option<EmailAttachment> {
        let assets = ResolvedAssets {
            signature_image: match &signature_reference {
                Some(reference) => self.assets.load(reference).await,
                None => None,
            },
            script_font: self.assets.fetch(&self.config.script_font_url()).await,
        };
        let fields = CertificateFields::for_attendee(event, attendee, signature_reference);

        match self.renderer.render(&fields, &assets) {
            Ok(document) => Some(EmailAttachment::pdf(
                format!("CEU_Certificate_{}.pdf", attendee.last_name),
                &document.bytes,
            )),
            Err(err) => {
                tracing::warn!(
                    email,
                    error = %err,
                    "certificate render failed, sending without attachment"
                );
                None
            }
        }
    }

    /// Reports which attendee emails still have no successful delivery.
    pub async fn delivery_coverage(&self, event_id: &str) -> DeliveryResult<CoverageReport> {
        self.events
            .event(event_id)
            .await?
            .ok_or_else(|| DeliveryError::EventNotFound(event_id.to_string()))?;
        let attendees = self.attendees.attendees_for_event(event_id).await?;
        let sent = self.ledger.sent_emails(event_id).await?;

        let mut seen = HashSet::new();
        let mut total = 0usize;
        let mut missing = Vec::new();
        for attendee in &attendees {
            let email = normalize_email(&attendee.email);
            if email.is_empty() || !seen.insert(email.clone()) {
                continue;
            }
            total += 1;
            if !sent.contains(&email) {
                missing.push(email);
            }
        }

        Ok(CoverageReport {
            event_id: event_id.to_string(),
            total_recipients: total,
            sent: total - missing.len(),
            missing,
        })
    }
}
