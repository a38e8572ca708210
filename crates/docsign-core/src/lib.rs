//! Signature request lifecycle
//!
//! Provider-agnostic handling of documents sent for electronic signature:
//! provider clients behind a common trait, a registry selecting them by
//! name, the envelope state machine, and best-effort progress
//! notifications.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod provider;
pub mod registry;

pub use config::{ConfigError, DocuSignConfig, NotifierConfig, ProvidersConfig};
pub use error::SignatureError;
pub use lifecycle::SignatureLifecycle;
pub use notify::{Notification, Notifier, NotifyOutcome};
pub use provider::{Credential, ProviderClient};
pub use registry::ProviderRegistry;
