//! Email composition.
//!
//! Builds the plain-text body, its HTML rendering, the per-recipient
//! certificate link, and the raw multipart message the send endpoint
//! expects. No network I/O happens here.

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use base64::Engine;
use chrono::Utc;
use url::form_urlencoded;

use crate::config::MailerConfig;
use crate::types::{Attendee, Event};

/// A binary attachment carried by a composed message.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    /// Attachment filename.
    pub filename: String,
    /// Base64-encoded content.
    pub content: String,
    /// MIME content type.
    pub content_type: String,
}

impl EmailAttachment {
    /// Wraps rendered certificate bytes as a PDF attachment.
    pub fn pdf(filename: impl Into<String>, bytes: &[u8]) -> Self {
        EmailAttachment {
            filename: filename.into(),
            content: BASE64.encode(bytes),
            content_type: "application/pdf".to_string(),
        }
    }
}

/// A fully composed message, ready for the transport.
#[derive(Debug, Clone)]
pub struct ComposedEmail {
    /// The RFC 822-style multipart source.
    pub mime: String,
    /// The base64url encoding of `mime`, as the send endpoint expects.
    pub raw: String,
}

/// Builds messages for one sender identity.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    from_email: String,
    from_name: String,
}

impl MessageComposer {
    /// Creates a composer for the configured sender.
    pub fn new(config: &MailerConfig) -> Self {
        MessageComposer {
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    /// Plain-text body for one recipient.
    pub fn body_text(&self, event: &Event, attendee: &Attendee, link: &str) -> String {
        let event_id = event.registration_id().unwrap_or("UNKNOWN");
        let greeting = format!("{} {}", attendee.first_name, attendee.last_name)
            .trim()
            .to_string();
        [
            "Download your certificate:".to_string(),
            link.to_string(),
            String::new(),
            format!("Dear {greeting},"),
            String::new(),
            format!("Thank you for attending \"{}\".", event.title),
            String::new(),
            "Your CEU certificate is now ready! Download it using the link above.".to_string(),
            String::new(),
            "Certificate Details:".to_string(),
            format!("- Event ID: {event_id}"),
            format!("- Certificate ID: {}", attendee.id),
            format!("- CEU Hours: {}", event.hours),
            format!("- Type: {}", event.event_type.label()),
            String::new(),
            "If you have any questions, please don't hesitate to reach out.".to_string(),
            String::new(),
            "Best regards,".to_string(),
            format!("{} Team", self.from_name),
        ]
        .join("\n")
    }

    /// Builds the raw multipart message and its base64url encoding.
    ///
    /// Structure: multipart/mixed over a nested multipart/alternative
    /// (text + HTML), plus a base64 attachment part when one is given.
    /// The boundary is time-derived so it cannot collide with body text.
    pub fn compose(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        html: &str,
        attachment: Option<&EmailAttachment>,
    ) -> ComposedEmail {
        let boundary = format!("boundary_{}", Utc::now().timestamp_millis());
        let from_header = if self.from_name.is_empty() {
            self.from_email.clone()
        } else {
            format!("{} <{}>", self.from_name, self.from_email)
        };

        let mut parts = vec![
            format!("From: {from_header}"),
            format!("To: {to}"),
            format!("Subject: {subject}"),
            "MIME-Version: 1.0".to_string(),
            format!("Content-Type: multipart/mixed; boundary=\"{boundary}\""),
            String::new(),
            format!("--{boundary}"),
            format!("Content-Type: multipart/alternative; boundary=\"alt_{boundary}\""),
            String::new(),
            format!("--alt_{boundary}"),
            "Content-Type: text/plain; charset=UTF-8".to_string(),
            String::new(),
            text.to_string(),
            String::new(),
            format!("--alt_{boundary}"),
            "Content-Type: text/html; charset=UTF-8".to_string(),
            String::new(),
            html.to_string(),
            String::new(),
            format!("--alt_{boundary}--"),
        ];

        if let Some(attachment) = attachment {
            parts.extend([
                String::new(),
                format!("--{boundary}"),
                format!(
                    "Content-Type: {}; name=\"{}\"",
                    attachment.content_type, attachment.filename
                ),
                format!(
                    "Content-Disposition: attachment; filename=\"{}\"",
                    attachment.filename
                ),
                "Content-Transfer-Encoding: base64".to_string(),
                String::new(),
                attachment.content.clone(),
            ]);
        }

        parts.extend([String::new(), format!("--{boundary}--")]);

        let mime = parts.join("\r\n");
        let raw = BASE64_URL.encode(mime.as_bytes());
        ComposedEmail { mime, raw }
    }
}

/// Builds the per-recipient certificate download link.
///
/// The link resolves to the event landing page with the certificate
/// pre-selected; optional params are dropped when the source field is
/// empty, matching how printed links have always looked.
pub fn certificate_link(app_url: &str, registration_id: &str, attendee: &Attendee) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("cert", &attendee.id);
    query.append_pair("email", &attendee.email);
    if let Some(cert_number) = attendee.cert_number() {
        query.append_pair("bcba", cert_number);
    }
    if !attendee.first_name.is_empty() {
        query.append_pair("first", &attendee.first_name);
    }
    if !attendee.last_name.is_empty() {
        query.append_pair("last", &attendee.last_name);
    }
    format!("{app_url}/event/{registration_id}?{}", query.finish())
}

/// Derives the HTML body from the plain text.
///
/// The text is HTML-escaped, the one certificate link becomes an anchor
/// (keeping the bare link visible below it), and newlines become line
/// breaks.
pub fn body_html(text: &str, link: &str) -> String {
    let escaped = escape_html(text);
    let escaped_link = escape_html(link);
    let with_anchor = escaped.replacen(
        &escaped_link,
        &format!("<a href=\"{escaped_link}\">Download Certificate</a><br/>{escaped_link}"),
        1,
    );
    let html = with_anchor.replace('\n', "<br/>");
    format!("<div style=\"font-family: Arial, sans-serif; line-height: 1.5;\">{html}</div>")
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventType;

    fn event() -> Event {
        Event {
            id: "ev1".into(),
            legacy_id: Some("OP-04-0012".into()),
            title: "Intro to Ethics".into(),
            date: "2026-03-05".into(),
            hours: 1.5,
            event_type: EventType::Ethics,
            modality: None,
            instructor_name: "Dana Instructor".into(),
            ace_coordinator_name: "Casey Coordinator".into(),
            ace_organization_name: None,
            ace_provider_type: None,
            provider_id: "OP-04-0012".into(),
            email_subject: None,
        }
    }

    fn attendee() -> Attendee {
        Attendee {
            id: "at1".into(),
            event_id: "ev1".into(),
            first_name: "Jordan".into(),
            last_name: "O'Learner".into(),
            email: "Jordan@Example.com".into(),
            bcba_number: Some("1-23-45678".into()),
            rbt_number: None,
        }
    }

    fn composer() -> MessageComposer {
        MessageComposer::new(&MailerConfig::unconfigured())
    }

    #[test]
    fn link_carries_identifying_params() {
        let link = certificate_link("https://ceu.example.org", "OP-04-0012", &attendee());
        assert!(link.starts_with("https://ceu.example.org/event/OP-04-0012?"));
        assert!(link.contains("cert=at1"));
        assert!(link.contains("email=Jordan%40Example.com"));
        assert!(link.contains("bcba=1-23-45678"));
        assert!(link.contains("first=Jordan"));
        assert!(link.contains("last=O%27Learner"));
    }

    #[test]
    fn link_drops_empty_optional_params() {
        let mut a = attendee();
        a.bcba_number = None;
        a.first_name = String::new();
        let link = certificate_link("https://ceu.example.org", "OP-04-0012", &a);
        assert!(!link.contains("bcba="));
        assert!(!link.contains("first="));
        assert!(link.contains("last="));
    }

    #[test]
    fn body_text_lists_certificate_details() {
        let link = "https://ceu.example.org/event/OP-04-0012?cert=at1";
        let text = composer().body_text(&event(), &attendee(), link);
        assert!(text.starts_with("Download your certificate:\nhttps://"));
        assert!(text.contains("Dear Jordan O'Learner,"));
        assert!(text.contains("Thank you for attending \"Intro to Ethics\"."));
        assert!(text.contains("- Event ID: OP-04-0012"));
        assert!(text.contains("- Certificate ID: at1"));
        assert!(text.contains("- CEU Hours: 1.5"));
        assert!(text.contains("- Type: Ethics"));
        assert!(text.ends_with("Best regards,\nBAE SIG CEU Registry Team"));
    }

    #[test]
    fn html_escapes_and_anchors_the_link() {
        let link = "https://ceu.example.org/event/E1?cert=a&email=b";
        let text = format!("Download your certificate:\n{link}\n\n<Dear> You & Co.");
        let html = body_html(&text, link);
        assert!(html.contains("<a href=\"https://ceu.example.org/event/E1?cert=a&amp;email=b\">Download Certificate</a>"));
        assert!(html.contains("&lt;Dear&gt; You &amp; Co."));
        assert!(html.contains("<br/>"));
        assert!(!html.contains('\n'));
        assert!(html.starts_with("<div style=\"font-family: Arial, sans-serif;"));
    }

    #[test]
    fn composed_message_nests_alternative_inside_mixed() {
        let email = composer().compose(
            "to@example.com",
            "Your CEU Certificate is Ready!",
            "plain body",
            "<div>html body</div>",
            None,
        );
        assert!(email.mime.contains("From: BAE SIG CEU Registry <california.bae.sig@gmail.com>"));
        assert!(email.mime.contains("To: to@example.com"));
        assert!(email.mime.contains("Content-Type: multipart/mixed; boundary=\"boundary_"));
        assert!(email.mime.contains("Content-Type: multipart/alternative; boundary=\"alt_boundary_"));
        assert!(email.mime.contains("plain body"));
        assert!(email.mime.contains("<div>html body</div>"));
        assert!(!email.mime.contains("Content-Disposition: attachment"));
        assert!(email.mime.trim_end().ends_with("--"));
    }

    #[test]
    fn attachment_part_is_base64() {
        let attachment = EmailAttachment::pdf("CEU_Certificate_Learner.pdf", b"%PDF-1.4 fake");
        let email = composer().compose("to@example.com", "s", "t", "<p>h</p>", Some(&attachment));
        assert!(email.mime.contains("Content-Type: application/pdf; name=\"CEU_Certificate_Learner.pdf\""));
        assert!(email.mime.contains("Content-Disposition: attachment; filename=\"CEU_Certificate_Learner.pdf\""));
        assert!(email.mime.contains("Content-Transfer-Encoding: base64"));
        assert!(email.mime.contains(&BASE64.encode(b"%PDF-1.4 fake")));
    }

    #[test]
    fn raw_encoding_is_base64url_without_padding() {
        let email = composer().compose("to@example.com", "s", "body?>>?", "<p>h</p>", None);
        assert!(!email.raw.contains('+'));
        assert!(!email.raw.contains('/'));
        assert!(!email.raw.contains('='));
        let decoded = BASE64_URL.decode(email.raw.as_bytes()).unwrap();
        assert_eq!(decoded, email.mime.as_bytes());
    }
}
