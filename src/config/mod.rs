//! Mailer configuration.
//!
//! Credentials and sender identity come from the deployment environment;
//! everything carries a compiled default so a partially configured
//! environment still produces a usable (if send-disabled) config.

use secrecy::{ExposeSecret, SecretString};

/// Default sender address.
pub const DEFAULT_FROM_EMAIL: &str = "california.bae.sig@gmail.com";

/// Default sender display name.
pub const DEFAULT_FROM_NAME: &str = "BAE SIG CEU Registry";

/// Default public application base URL for certificate links.
pub const DEFAULT_APP_URL: &str = "https://bae-sig-ceu.web.app";

/// Default email subject line.
pub const DEFAULT_SUBJECT: &str = "Your CEU Certificate is Ready!";

/// Configuration for the certificate mailer.
#[derive(Clone)]
pub struct MailerConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: SecretString,
    /// Long-lived refresh token.
    pub refresh_token: SecretString,
    /// Sender address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
    /// Public application base URL (no trailing slash).
    pub app_url: String,
    /// Default subject when the event carries no override.
    pub default_subject: String,
}

impl MailerConfig {
    /// Reads configuration from the environment.
    ///
    /// Recognized variables: `GMAIL_CLIENT_ID`, `GMAIL_CLIENT_SECRET`,
    /// `GMAIL_REFRESH_TOKEN`, `GMAIL_FROM_EMAIL` (falling back to
    /// `GMAIL_USER`), `GMAIL_FROM_NAME`, `PUBLIC_APP_URL`,
    /// `CERT_EMAIL_SUBJECT`. Missing variables fall back to defaults;
    /// missing credentials leave the config valid but send-disabled.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        MailerConfig {
            client_id: var("GMAIL_CLIENT_ID").unwrap_or_default(),
            client_secret: SecretString::new(var("GMAIL_CLIENT_SECRET").unwrap_or_default()),
            refresh_token: SecretString::new(var("GMAIL_REFRESH_TOKEN").unwrap_or_default()),
            from_email: var("GMAIL_FROM_EMAIL")
                .or_else(|| var("GMAIL_USER"))
                .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            from_name: var("GMAIL_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            app_url: var("PUBLIC_APP_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            default_subject: var("CERT_EMAIL_SUBJECT")
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        }
    }

    /// Creates a config with explicit credentials and defaults elsewhere.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        MailerConfig {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            default_subject: DEFAULT_SUBJECT.to_string(),
        }
    }

    /// Config with no credentials at all. Sends will be recorded as failed.
    pub fn unconfigured() -> Self {
        Self::new("", "", "")
    }

    /// Sets the sender address and display name.
    pub fn with_sender(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.from_email = email.into();
        self.from_name = name.into();
        self
    }

    /// Sets the public application base URL.
    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.app_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Whether a token exchange can even be attempted.
    ///
    /// Mirrors the delivery gate: client id, client secret, refresh token,
    /// and a sender address must all be present.
    pub fn credentials_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.expose_secret().is_empty()
            && !self.refresh_token.expose_secret().is_empty()
            && !self.from_email.is_empty()
    }

    /// URL of the decorative signature font served by the application.
    pub fn script_font_url(&self) -> String {
        format!("{}/fonts/AlexBrush-Regular.ttf", self.app_url)
    }
}

impl std::fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("app_url", &self.app_url)
            .field("default_subject", &self.default_subject)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_gate_requires_all_four() {
        let config = MailerConfig::new("id", "secret", "refresh");
        assert!(config.credentials_configured());

        assert!(!MailerConfig::new("", "secret", "refresh").credentials_configured());
        assert!(!MailerConfig::new("id", "", "refresh").credentials_configured());
        assert!(!MailerConfig::new("id", "secret", "").credentials_configured());

        let config = MailerConfig::new("id", "secret", "refresh").with_sender("", "Registry");
        assert!(!config.credentials_configured());
    }

    #[test]
    fn app_url_trailing_slash_is_trimmed() {
        let config = MailerConfig::unconfigured().with_app_url("https://ceu.example.org/");
        assert_eq!(config.app_url, "https://ceu.example.org");
        assert_eq!(
            config.script_font_url(),
            "https://ceu.example.org/fonts/AlexBrush-Regular.ttf"
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", MailerConfig::new("id", "hunter2", "refresh-9"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("refresh-9"));
    }
}
