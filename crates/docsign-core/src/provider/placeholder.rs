//! Stand-ins registered for providers that cannot serve requests

use async_trait::async_trait;
use shared_types::{Document, ProviderKind, SignatureRequest, StatusReport};

use super::{Credential, ProviderClient};
use crate::error::SignatureError;

/// A provider known by name but without a client. Every operation fails
/// with `NotImplemented`.
#[derive(Debug, Clone, Copy)]
pub struct UnimplementedProvider {
    kind: ProviderKind,
}

impl UnimplementedProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }

    fn fail<T>(&self) -> Result<T, SignatureError> {
        Err(SignatureError::NotImplemented(
            self.kind.display_name().to_string(),
        ))
    }
}

#[async_trait]
impl ProviderClient for UnimplementedProvider {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    async fn authenticate(&self) -> Result<Credential, SignatureError> {
        self.fail()
    }

    async fn send(&self, _: &Credential, _: &SignatureRequest) -> Result<String, SignatureError> {
        self.fail()
    }

    async fn get_status(&self, _: &Credential, _: &str) -> Result<StatusReport, SignatureError> {
        self.fail()
    }

    async fn download(&self, _: &Credential, _: &str) -> Result<Document, SignatureError> {
        self.fail()
    }

    async fn cancel(&self, _: &Credential, _: &str, _: &str) -> Result<(), SignatureError> {
        self.fail()
    }
}

/// A provider with a client whose credentials were not supplied
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredProvider {
    kind: ProviderKind,
}

impl UnconfiguredProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }

    fn fail<T>(&self) -> Result<T, SignatureError> {
        Err(SignatureError::AuthError(format!(
            "{} is not configured",
            self.kind.display_name()
        )))
    }
}

#[async_trait]
impl ProviderClient for UnconfiguredProvider {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    async fn authenticate(&self) -> Result<Credential, SignatureError> {
        self.fail()
    }

    async fn send(&self, _: &Credential, _: &SignatureRequest) -> Result<String, SignatureError> {
        self.fail()
    }

    async fn get_status(&self, _: &Credential, _: &str) -> Result<StatusReport, SignatureError> {
        self.fail()
    }

    async fn download(&self, _: &Credential, _: &str) -> Result<Document, SignatureError> {
        self.fail()
    }

    async fn cancel(&self, _: &Credential, _: &str, _: &str) -> Result<(), SignatureError> {
        self.fail()
    }
}
