//! Domain types shared across the delivery pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Registration id that identifies the organization-level ACE provider.
///
/// Events registered under this id carry the Organization attestation
/// layout; everything else defaults to the Individual layout unless the
/// event is tagged explicitly.
pub const ORGANIZATION_PROVIDER_ID: &str = "OP-04-0012";

/// Provider legal name used when an event carries no organization name.
pub const DEFAULT_PROVIDER_NAME: &str = "BAE SIG";

/// Continuing-education credit category of an event.
///
/// Ethics and Supervision are mutually exclusive: an event's full credit
/// total is attributed to exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// General learning credits.
    Learning,
    /// Ethics credits.
    Ethics,
    /// Supervision credits.
    Supervision,
}

impl EventType {
    /// Display label used in email bodies.
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Learning => "Learning",
            EventType::Ethics => "Ethics",
            EventType::Supervision => "Supervision",
        }
    }
}

/// Delivery modality of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    /// Attended in person.
    #[serde(rename = "In-Person")]
    InPerson,
    /// Attended live online.
    #[serde(rename = "Online Synchronous")]
    OnlineSynchronous,
    /// Self-paced online.
    #[serde(rename = "Online Asynchronous")]
    OnlineAsynchronous,
}

impl Modality {
    /// Display label printed on certificates.
    pub fn label(&self) -> &'static str {
        match self {
            Modality::InPerson => "In-Person",
            Modality::OnlineSynchronous => "Online Synchronous",
            Modality::OnlineAsynchronous => "Online Asynchronous",
        }
    }
}

/// ACE provider classification selecting the attestation layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    /// Organization-level ACE provider.
    Organization,
    /// Individual ACE provider.
    Individual,
}

/// Event record as read from the event store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Store identifier.
    pub id: String,
    /// Registration id carried over from the legacy registry, if any.
    pub legacy_id: Option<String>,
    /// Event title.
    pub title: String,
    /// Event date as stored (ISO `YYYY-MM-DD` or a display string).
    pub date: String,
    /// Total CEU hours awarded.
    pub hours: f64,
    /// Credit category.
    pub event_type: EventType,
    /// Delivery modality, when recorded.
    pub modality: Option<Modality>,
    /// Instructor display name.
    pub instructor_name: String,
    /// ACE coordinator display name.
    pub ace_coordinator_name: String,
    /// ACE organization name, when the event ran under one.
    pub ace_organization_name: Option<String>,
    /// Explicit provider classification, when tagged.
    pub ace_provider_type: Option<ProviderType>,
    /// ACE provider registration id.
    pub provider_id: String,
    /// Custom email subject override.
    pub email_subject: Option<String>,
}

impl Event {
    /// Public registration id used in certificate links.
    ///
    /// Legacy ids take precedence so links printed before the registry
    /// migration keep resolving.
    pub fn registration_id(&self) -> Option<&str> {
        non_empty(self.legacy_id.as_deref()).or_else(|| non_empty(Some(&self.provider_id)))
    }

    /// Provider classification for this event. An explicit tag wins;
    /// otherwise the organization registration id selects the
    /// Organization layout.
    pub fn provider_type(&self) -> ProviderType {
        match self.ace_provider_type {
            Some(provider_type) => provider_type,
            None if self.provider_id == ORGANIZATION_PROVIDER_ID => ProviderType::Organization,
            None => ProviderType::Individual,
        }
    }
}

/// Attendee record as read from the attendee store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    /// Store identifier; doubles as the certificate id in links.
    pub id: String,
    /// Owning event.
    pub event_id: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address as entered (normalized at delivery time).
    pub email: String,
    /// BACB certification number (BCBA), if held.
    pub bcba_number: Option<String>,
    /// BACB certification number (RBT), if held.
    pub rbt_number: Option<String>,
}

impl Attendee {
    /// Certification number printed on the certificate. BCBA wins over RBT.
    pub fn cert_number(&self) -> Option<&str> {
        non_empty(self.bcba_number.as_deref()).or_else(|| non_empty(self.rbt_number.as_deref()))
    }

    /// Full display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Normalizes an email address for matching and delivery: trim and
/// lowercase. The normalized form is the unit of idempotency.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Everything the renderer needs for one certificate.
///
/// Derived per recipient from the event and attendee records; transient,
/// discarded once the recipient's attempt is logged.
#[derive(Debug, Clone)]
pub struct CertificateFields {
    /// Participant full name.
    pub participant_name: String,
    /// Participant certification number, if held.
    pub participant_cert_number: Option<String>,
    /// Course title.
    pub course_title: String,
    /// Issue date display string.
    pub issue_date: String,
    /// Total CEU hours.
    pub hours: f64,
    /// Ethics subtotal. Zero unless the event is an Ethics event.
    pub ethics_hours: f64,
    /// Supervision subtotal. Zero unless the event is a Supervision event.
    pub supervision_hours: f64,
    /// Instructor display name.
    pub instructor: String,
    /// Provider legal name.
    pub provider_name: String,
    /// Provider registration id.
    pub provider_id: String,
    /// ACE coordinator display name.
    pub coordinator: String,
    /// Organization name, when the event ran under one.
    pub organization_name: Option<String>,
    /// Attestation layout selector.
    pub provider_type: ProviderType,
    /// Delivery modality label.
    pub modality: String,
    /// Reference to a stored signature image (data URI or URL).
    pub signature_reference: Option<String>,
}

impl CertificateFields {
    /// Derives the certificate fields for one attendee of an event.
    ///
    /// The ethics/supervision subtotals each equal the event total for
    /// their own category and zero otherwise.
    pub fn for_attendee(
        event: &Event,
        attendee: &Attendee,
        signature_reference: Option<String>,
    ) -> Self {
        CertificateFields {
            participant_name: attendee.full_name(),
            participant_cert_number: attendee.cert_number().map(str::to_owned),
            course_title: event.title.clone(),
            issue_date: format_issue_date(&event.date),
            hours: event.hours,
            ethics_hours: match event.event_type {
                EventType::Ethics => event.hours,
                _ => 0.0,
            },
            supervision_hours: match event.event_type {
                EventType::Supervision => event.hours,
                _ => 0.0,
            },
            instructor: event.instructor_name.clone(),
            provider_name: event
                .ace_organization_name
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
            provider_id: event.provider_id.clone(),
            coordinator: event.ace_coordinator_name.clone(),
            organization_name: event.ace_organization_name.clone(),
            provider_type: event.provider_type(),
            modality: event
                .modality
                .unwrap_or(Modality::OnlineSynchronous)
                .label()
                .to_string(),
            signature_reference,
        }
    }
}

/// Formats a stored event date as a long-form display date.
///
/// ISO dates become e.g. `March 5, 2026`; anything else passes through
/// unchanged so legacy display strings keep rendering.
pub fn format_issue_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%B %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Terminal state of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// The provider accepted the message.
    Sent,
    /// The send was attempted and refused, or could not be attempted.
    Failed,
    /// The recipient was deliberately not sent to.
    Skipped,
}

/// One immutable row in the delivery ledger.
///
/// Created exactly once per recipient per run and never mutated;
/// corrections are new attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    /// Event the delivery belongs to.
    pub event_id: String,
    /// Attendee the delivery addressed.
    pub attendee_id: String,
    /// Normalized recipient email.
    pub email: String,
    /// Message subject.
    pub subject: String,
    /// Plain-text message body as sent (or a skip note).
    pub body: String,
    /// Certificate link embedded in the message, empty for skips.
    pub link: String,
    /// Terminal state.
    pub status: DeliveryStatus,
    /// Mail provider name.
    pub provider: String,
    /// Provider-assigned message id on success.
    pub provider_message_id: Option<String>,
    /// Failure or skip reason.
    pub error: Option<String>,
    /// RFC 3339 timestamp of the run.
    pub sent_at: String,
    /// Batch the attempt belongs to.
    pub batch_id: String,
}

/// In-memory tally of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryBatchSummary {
    /// Batch identifier shared by this run's ledger rows.
    pub batch_id: String,
    /// Recipients that reached the dry-run gate or beyond.
    pub attempted: usize,
    /// Accepted sends.
    pub sent: usize,
    /// Refused or unattemptable sends.
    pub failed: usize,
    /// Deliberate skips, including pre-filtered duplicates.
    pub skipped: usize,
}

impl DeliveryBatchSummary {
    /// Creates an empty summary for a batch.
    pub fn new(batch_id: impl Into<String>) -> Self {
        DeliveryBatchSummary {
            batch_id: batch_id.into(),
            attempted: 0,
            sent: 0,
            failed: 0,
            skipped: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: EventType, hours: f64) -> Event {
        Event {
            id: "ev1".into(),
            legacy_id: None,
            title: "Intro to Ethics".into(),
            date: "2026-03-05".into(),
            hours,
            event_type,
            modality: None,
            instructor_name: "Dana Instructor".into(),
            ace_coordinator_name: "Casey Coordinator".into(),
            ace_organization_name: None,
            ace_provider_type: None,
            provider_id: ORGANIZATION_PROVIDER_ID.into(),
            email_subject: None,
        }
    }

    fn attendee() -> Attendee {
        Attendee {
            id: "at1".into(),
            event_id: "ev1".into(),
            first_name: "Jordan".into(),
            last_name: "Learner".into(),
            email: "jordan@example.com".into(),
            bcba_number: None,
            rbt_number: Some("RBT-77".into()),
        }
    }

    #[test]
    fn ethics_hours_follow_event_type() {
        let fields = CertificateFields::for_attendee(&event(EventType::Ethics, 2.0), &attendee(), None);
        assert_eq!(fields.ethics_hours, 2.0);
        assert_eq!(fields.supervision_hours, 0.0);

        let fields =
            CertificateFields::for_attendee(&event(EventType::Supervision, 1.5), &attendee(), None);
        assert_eq!(fields.ethics_hours, 0.0);
        assert_eq!(fields.supervision_hours, 1.5);

        let fields = CertificateFields::for_attendee(&event(EventType::Learning, 3.0), &attendee(), None);
        assert_eq!(fields.ethics_hours, 0.0);
        assert_eq!(fields.supervision_hours, 0.0);
    }

    #[test]
    fn cert_number_prefers_bcba() {
        let mut a = attendee();
        assert_eq!(a.cert_number(), Some("RBT-77"));
        a.bcba_number = Some("1-23-45678".into());
        assert_eq!(a.cert_number(), Some("1-23-45678"));
        a.bcba_number = Some(String::new());
        assert_eq!(a.cert_number(), Some("RBT-77"));
    }

    #[test]
    fn registration_id_prefers_legacy() {
        let mut e = event(EventType::Learning, 1.0);
        assert_eq!(e.registration_id(), Some(ORGANIZATION_PROVIDER_ID));
        e.legacy_id = Some("LEGACY-9".into());
        assert_eq!(e.registration_id(), Some("LEGACY-9"));
        e.legacy_id = Some(String::new());
        e.provider_id = String::new();
        assert_eq!(e.registration_id(), None);
    }

    #[test]
    fn provider_type_falls_back_to_registration_constant() {
        let mut e = event(EventType::Learning, 1.0);
        assert_eq!(e.provider_type(), ProviderType::Organization);
        e.provider_id = "IP-99-1234".into();
        assert_eq!(e.provider_type(), ProviderType::Individual);
        e.ace_provider_type = Some(ProviderType::Organization);
        assert_eq!(e.provider_type(), ProviderType::Organization);
    }

    #[test]
    fn issue_date_formats_iso_dates() {
        assert_eq!(format_issue_date("2026-03-05"), "March 5, 2026");
        assert_eq!(format_issue_date("March 5, 2026"), "March 5, 2026");
    }

    #[test]
    fn delivery_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DeliveryStatus::Sent).unwrap(), "\"sent\"");
        assert_eq!(serde_json::to_string(&DeliveryStatus::Skipped).unwrap(), "\"skipped\"");
    }
}
