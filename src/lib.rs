//! Certificate Delivery Pipeline
//!
//! Renders proof-of-attendance certificates for continuing-education
//! events and delivers them by email through the Gmail REST API. For a
//! given event, one run renders a compliance-grade PDF per recipient,
//! composes a multipart message around it, sends it with an
//! OAuth2-acquired bearer token, and records every attempt in an
//! append-only delivery ledger that makes re-runs idempotent.
//!
//! # Design
//!
//! - **Rendering is pure**: [`render::CertificateRenderer`] turns
//!   [`types::CertificateFields`] plus pre-resolved asset bytes into PDF
//!   bytes. All I/O (signature images, the script font) happens in
//!   [`assets::AssetLoader`] before rendering.
//! - **Per-recipient failures never abort the batch**: a rejected send or
//!   missing credentials become a `failed` ledger row and the run moves
//!   on. Only run-level faults (missing event, token exchange) propagate.
//! - **Recipients are processed sequentially**: one worker, deterministic
//!   ledger ordering, no rate-limit bursts.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ceu_delivery::config::MailerConfig;
//! use ceu_delivery::delivery::CertificateMailer;
//! use ceu_delivery::ledger::InMemoryLedger;
//! use ceu_delivery::stores::{InMemoryAttendeeStore, InMemoryEventStore, InMemorySignatureDirectory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mailer = CertificateMailer::new(
//!     MailerConfig::from_env(),
//!     Arc::new(InMemoryEventStore::new()),
//!     Arc::new(InMemoryAttendeeStore::new()),
//!     Arc::new(InMemorySignatureDirectory::new()),
//!     Arc::new(InMemoryLedger::new()),
//! );
//!
//! let summary = mailer.deliver_certificates("ev_123", None, false).await?;
//! println!("sent {} of {} attempted", summary.sent, summary.attempted);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assets;
pub mod auth;
pub mod compose;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod ledger;
pub mod render;
pub mod stores;
pub mod transport;
pub mod types;

pub use config::MailerConfig;
pub use delivery::{CertificateMailer, CoverageReport};
pub use errors::{DeliveryError, DeliveryResult};
pub use types::{DeliveryAttempt, DeliveryBatchSummary, DeliveryStatus};

/// Prelude with the types most embeddings need.
pub mod prelude {
    pub use crate::assets::AssetLoader;
    pub use crate::auth::{AccessToken, OAuth2TokenProvider, TokenProvider};
    pub use crate::compose::MessageComposer;
    pub use crate::config::MailerConfig;
    pub use crate::delivery::{CertificateMailer, CoverageReport};
    pub use crate::errors::{DeliveryError, DeliveryResult};
    pub use crate::ledger::{DeliveryLedger, InMemoryLedger};
    pub use crate::render::{CertificateRenderer, DocumentRenderer, RenderedDocument};
    pub use crate::stores::{
        AttendeeStore, EventStore, InMemoryAttendeeStore, InMemoryEventStore,
        InMemorySignatureDirectory, SignatureDirectory,
    };
    pub use crate::transport::{GmailTransport, MailTransport, SendOutcome};
    pub use crate::types::{
        Attendee, CertificateFields, DeliveryAttempt, DeliveryBatchSummary, DeliveryStatus,
        Event, EventType, Modality, ProviderType,
    };
}
