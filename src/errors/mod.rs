//! Error types for the certificate delivery pipeline.

use thiserror::Error;

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Top-level error type for a delivery run.
///
/// Only run-level failures surface here. Per-recipient failures (a rejected
/// send, missing credentials) are absorbed into ledger rows and never abort
/// the batch.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Token exchange failed. Fatal to the run.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Collaborator store read/append failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Event not found.
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// Event has no registration id to build certificate links from.
    #[error("Event {0} is missing a registration id")]
    MissingRegistrationId(String),
}

/// Errors raised while exchanging the refresh credential for an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint could not be reached.
    #[error("Token request failed: {0}")]
    RequestFailed(String),

    /// The token endpoint answered, but refused the exchange or omitted a token.
    ///
    /// The message carries the provider's stated reason when it gave one.
    #[error("Token exchange rejected: {0}")]
    ExchangeRejected(String),

    /// The token response could not be parsed.
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

/// Errors raised while laying out the certificate page.
///
/// Rendering fails atomically; a failed render downgrades the recipient's
/// send to a no-attachment send rather than aborting the recipient.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The PDF backend rejected the page geometry or content.
    #[error("Page construction failed: {0}")]
    Page(String),

    /// The finished document could not be serialized.
    #[error("Document serialization failed: {0}")]
    Serialize(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured value failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Collaborator store errors.
///
/// Event, attendee, directory, and ledger collaborators are external to this
/// crate; any failure on their side is a run-level fault.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A read against a collaborator store failed.
    #[error("Store read failed: {0}")]
    Read(String),

    /// Appending a ledger row failed.
    #[error("Ledger append failed: {0}")]
    Append(String),
}

impl StoreError {
    /// Creates a read error.
    pub fn read(msg: impl Into<String>) -> Self {
        StoreError::Read(msg.into())
    }

    /// Creates an append error.
    pub fn append(msg: impl Into<String>) -> Self {
        StoreError::Append(msg.into())
    }
}
