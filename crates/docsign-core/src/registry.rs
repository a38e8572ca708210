//! Provider registry
//!
//! Resolves a logical provider name to its client. Names that are not a
//! known [`ProviderKind`], and kinds without a registered client, resolve
//! to `NotImplemented`.

use std::collections::BTreeMap;

use shared_types::ProviderKind;

use crate::config::ProvidersConfig;
use crate::error::SignatureError;
use crate::provider::{DocuSignClient, ProviderClient, UnconfiguredProvider, UnimplementedProvider};

pub struct ProviderRegistry {
    providers: BTreeMap<ProviderKind, Box<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// An empty registry; every lookup fails with `NotImplemented`
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// Register the built-in clients.
    ///
    /// DocuSign without credentials is registered as unconfigured so its
    /// calls fail with `AuthError`. Adobe Sign has no client yet.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, SignatureError> {
        let mut registry = Self::new();
        match &config.docusign {
            Some(docusign) => {
                registry.register(Box::new(DocuSignClient::new(docusign.clone())?));
            }
            None => {
                tracing::warn!("DocuSign credentials not configured; signature calls will fail");
                registry.register(Box::new(UnconfiguredProvider::new(ProviderKind::DocuSign)));
            }
        }
        registry.register(Box::new(UnimplementedProvider::new(ProviderKind::AdobeSign)));
        Ok(registry)
    }

    /// Register a client under its own provider kind, replacing any
    /// previous one.
    pub fn register(&mut self, client: Box<dyn ProviderClient>) -> Option<Box<dyn ProviderClient>> {
        self.providers.insert(client.provider(), client)
    }

    pub fn with(mut self, client: Box<dyn ProviderClient>) -> Self {
        self.register(client);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Result<&dyn ProviderClient, SignatureError> {
        self.providers
            .get(&kind)
            .map(|client| client.as_ref())
            .ok_or_else(|| SignatureError::NotImplemented(kind.display_name().to_string()))
    }

    pub fn resolve(&self, name: &str) -> Result<&dyn ProviderClient, SignatureError> {
        let kind: ProviderKind = name
            .parse()
            .map_err(|_| SignatureError::NotImplemented(name.to_string()))?;
        self.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.providers.keys().copied()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ErrorKind;

    #[test]
    fn test_unknown_name_is_not_implemented() {
        let registry = ProviderRegistry::from_config(&ProvidersConfig::default()).unwrap();
        let err = registry.resolve("hellosign").err().unwrap();
        assert_eq!(err, SignatureError::NotImplemented("hellosign".to_string()));
    }

    #[test]
    fn test_builtin_kinds_registered() {
        let registry = ProviderRegistry::from_config(&ProvidersConfig::default()).unwrap();
        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds, vec![ProviderKind::DocuSign, ProviderKind::AdobeSign]);
        assert_eq!(
            registry.resolve("ADOBE").unwrap().provider(),
            ProviderKind::AdobeSign
        );
    }

    #[test]
    fn test_empty_registry() {
        let err = ProviderRegistry::new()
            .get(ProviderKind::DocuSign)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }
}
