//! Endpoint sources, settings, validation, and the refresh loop.
//!
//! Defines the [`EndpointSource`] trait for anything that can produce a
//! complete endpoint set, the [`SourceVersion`] enum for change
//! detection, and [`StaticSource`] for endpoints given on the command
//! line. Submodules provide the data model, validation logic, file
//! sources and the [`watch`] loop that publishes changes into the
//! [`EndpointRegistry`](crate::broadcast::registry::EndpointRegistry).

pub mod model;
pub mod sources;
pub mod validation;
pub mod watch;

use async_trait::async_trait;

use crate::broadcast::registry::Endpoint;
use crate::error::PurgecastError;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceVersion {
    Hash(String),
    Static,
}

// async_trait is required here because EndpointSource is used as Box<dyn EndpointSource>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait EndpointSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Vec<Endpoint>, SourceVersion), PurgecastError>;
    async fn has_changed(&self, current: &SourceVersion) -> Result<bool, PurgecastError>;
}

/// Endpoints fixed at startup.
pub struct StaticSource {
    endpoints: Vec<Endpoint>,
}

impl StaticSource {
    #[must_use]
    pub const fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl EndpointSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn load(&self) -> Result<(Vec<Endpoint>, SourceVersion), PurgecastError> {
        Ok((self.endpoints.clone(), SourceVersion::Static))
    }

    async fn has_changed(&self, _current: &SourceVersion) -> Result<bool, PurgecastError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_never_changes() {
        let source = StaticSource::new(vec![Endpoint::new("a", "80")]);
        let (endpoints, version) = source.load().await.unwrap();
        assert_eq!(endpoints.len(), 1);
        assert!(!source.has_changed(&version).await.unwrap());
    }
}
