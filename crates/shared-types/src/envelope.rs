//! Provider-independent envelope lifecycle types
//!
//! An envelope is identified by `(provider, envelope_id)`; ids are only
//! unique within one provider's namespace.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Recipient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "docusign")]
    DocuSign,
    #[serde(rename = "adobe_sign")]
    AdobeSign,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::DocuSign => "docusign",
            ProviderKind::AdobeSign => "adobe_sign",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::DocuSign => "DocuSign",
            ProviderKind::AdobeSign => "Adobe Sign",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docusign" => Ok(ProviderKind::DocuSign),
            "adobe" | "adobe_sign" | "adobesign" | "adobe-sign" => Ok(ProviderKind::AdobeSign),
            other => Err(other.to_string()),
        }
    }
}

/// Canonical envelope state.
///
/// ```text
/// sent -> delivered -> completed   (terminal, success)
/// sent -> declined                 (terminal, recipient rejected)
/// sent -> voided                   (terminal, sender cancelled)
/// any  -> error                    (terminal, local)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeState {
    Sent,
    Delivered,
    Completed,
    Declined,
    Voided,
    Error,
}

impl EnvelopeState {
    pub const ALL: [EnvelopeState; 6] = [
        EnvelopeState::Sent,
        EnvelopeState::Delivered,
        EnvelopeState::Completed,
        EnvelopeState::Declined,
        EnvelopeState::Voided,
        EnvelopeState::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeState::Sent => "sent",
            EnvelopeState::Delivered => "delivered",
            EnvelopeState::Completed => "completed",
            EnvelopeState::Declined => "declined",
            EnvelopeState::Voided => "voided",
            EnvelopeState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EnvelopeState::Sent | EnvelopeState::Delivered)
    }

    /// Whether `next` may be observed after `self` on a later poll.
    ///
    /// Repeated observations of the same state are always legal. Polls can
    /// skip intermediate states, so this is reachability in the transition
    /// graph rather than single-edge adjacency.
    pub fn can_transition_to(&self, next: EnvelopeState) -> bool {
        use EnvelopeState::*;

        if *self == next {
            return true;
        }
        match (self, next) {
            (_, Error) => !self.is_terminal(),
            (Sent, Delivered | Completed | Declined | Voided) => true,
            (Delivered, Completed | Declined | Voided) => true,
            _ => false,
        }
    }
}

impl fmt::Display for EnvelopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvelopeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvelopeState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientStatus {
    pub email: String,
    pub name: String,
    /// Provider-native recipient status, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

impl From<&Recipient> for RecipientStatus {
    fn from(recipient: &Recipient) -> Self {
        Self {
            email: recipient.email.clone(),
            name: recipient.name.clone(),
            status: None,
            signed_at: None,
        }
    }
}

/// A provider's answer to a status query, already mapped onto the
/// canonical state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub state: EnvelopeState,
    pub native_status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub recipients: Vec<RecipientStatus>,
}

impl StatusReport {
    pub fn new(state: EnvelopeState, native_status: impl Into<String>) -> Self {
        Self {
            state,
            native_status: native_status.into(),
            created_at: None,
            completed_at: None,
            recipients: Vec::new(),
        }
    }
}

/// A remote signature request as last observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub envelope_id: String,
    pub provider: ProviderKind,
    pub state: EnvelopeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    pub recipients: Vec<RecipientStatus>,
}

impl Envelope {
    /// Envelope for a request the provider just accepted
    pub fn sent(
        provider: ProviderKind,
        envelope_id: impl Into<String>,
        recipients: &[Recipient],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            envelope_id: envelope_id.into(),
            provider,
            state: EnvelopeState::Sent,
            native_status: None,
            created_at: Some(now),
            completed_at: None,
            last_checked_at: None,
            recipients: recipients.iter().map(RecipientStatus::from).collect(),
        }
    }

    /// Envelope as described by a status poll
    pub fn observed(
        provider: ProviderKind,
        envelope_id: impl Into<String>,
        report: StatusReport,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            envelope_id: envelope_id.into(),
            provider,
            state: report.state,
            native_status: Some(report.native_status),
            created_at: report.created_at,
            completed_at: report.completed_at,
            last_checked_at: Some(checked_at),
            recipients: report.recipients,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_terminal_states() {
        assert!(!EnvelopeState::Sent.is_terminal());
        assert!(!EnvelopeState::Delivered.is_terminal());
        assert!(EnvelopeState::Completed.is_terminal());
        assert!(EnvelopeState::Declined.is_terminal());
        assert!(EnvelopeState::Voided.is_terminal());
        assert!(EnvelopeState::Error.is_terminal());
    }

    #[test]
    fn test_completed_never_regresses() {
        assert!(!EnvelopeState::Completed.can_transition_to(EnvelopeState::Sent));
        assert!(!EnvelopeState::Completed.can_transition_to(EnvelopeState::Delivered));
        assert!(!EnvelopeState::Completed.can_transition_to(EnvelopeState::Error));
        assert!(EnvelopeState::Completed.can_transition_to(EnvelopeState::Completed));
    }

    #[test]
    fn test_forward_edges() {
        assert!(EnvelopeState::Sent.can_transition_to(EnvelopeState::Delivered));
        assert!(EnvelopeState::Sent.can_transition_to(EnvelopeState::Completed));
        assert!(EnvelopeState::Sent.can_transition_to(EnvelopeState::Declined));
        assert!(EnvelopeState::Sent.can_transition_to(EnvelopeState::Voided));
        assert!(EnvelopeState::Delivered.can_transition_to(EnvelopeState::Declined));
        assert!(EnvelopeState::Delivered.can_transition_to(EnvelopeState::Error));
        assert!(!EnvelopeState::Delivered.can_transition_to(EnvelopeState::Sent));
    }

    #[test]
    fn test_provider_kind_aliases() {
        assert_eq!("DocuSign".parse::<ProviderKind>(), Ok(ProviderKind::DocuSign));
        assert_eq!("adobe".parse::<ProviderKind>(), Ok(ProviderKind::AdobeSign));
        assert_eq!(
            "hellosign".parse::<ProviderKind>(),
            Err("hellosign".to_string())
        );
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = Envelope::sent(
            ProviderKind::DocuSign,
            "abc-123",
            &[Recipient::new("a@b.com", "A")],
            Utc::now(),
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["provider"], "docusign");
        assert_eq!(json["state"], "sent");
        assert_eq!(json["recipients"][0]["email"], "a@b.com");
        assert!(json.get("last_checked_at").is_none());
    }

    fn any_state() -> impl Strategy<Value = EnvelopeState> {
        prop::sample::select(EnvelopeState::ALL.to_vec())
    }

    /// Any chain of legal observations is legal end to end
    #[test]
    fn test_transitions_compose() {
        for a in EnvelopeState::ALL {
            for b in EnvelopeState::ALL {
                for c in EnvelopeState::ALL {
                    if a.can_transition_to(b) && b.can_transition_to(c) {
                        assert!(a.can_transition_to(c), "{} -> {} -> {}", a, b, c);
                    }
                }
            }
        }
    }

    proptest! {
        /// Property: terminal states only ever repeat
        #[test]
        fn terminal_states_are_absorbing(a in any_state(), b in any_state()) {
            prop_assume!(a.is_terminal() && a != b);
            prop_assert!(!a.can_transition_to(b));
        }

        #[test]
        fn state_names_round_trip(a in any_state()) {
            prop_assert_eq!(a.as_str().parse::<EnvelopeState>(), Ok(a));
        }
    }
}
