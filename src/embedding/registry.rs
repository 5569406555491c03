// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend registry: maps a selector token to an embedding provider factory.
//!
//! The canonical backend id also names the collection directory and keys the
//! chunk-size table, so ids are restricted to `[a-z0-9_-]+`.

use std::sync::Arc;

use super::endpoint::EndpointProvider;
use super::gemini::GeminiProvider;
use super::provider::{EmbeddingProvider, HashingProvider};
use crate::config::Config;
use crate::errors::{EmbeddingError, Error};
use crate::http;

/// Builds a provider from configuration.
pub type ProviderFactory =
    Arc<dyn Fn(&Config) -> Result<Box<dyn EmbeddingProvider>, EmbeddingError> + Send + Sync>;

/// Returns true when `id` can be used as a backend id.
pub fn is_valid_backend_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// A registered embedding backend.
#[derive(Clone)]
pub struct Backend {
    id: String,
    aliases: Vec<String>,
    factory: ProviderFactory,
}

impl Backend {
    /// Canonical id ("hf", "gemini", ...).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Constructs the provider for this backend.
    pub fn build(&self, config: &Config) -> Result<Box<dyn EmbeddingProvider>, EmbeddingError> {
        (self.factory)(config)
    }

    fn matches(&self, token: &str) -> bool {
        self.id == token || self.aliases.iter().any(|a| a == token)
    }
}

/// Ordered set of known backends.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Backend>,
}

impl BackendRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backends: `hf` (alias `local`),
    /// `gemini` (alias `cloud`) and the offline `hashing` backend.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let register = |registry: &mut Self, id: &str, aliases: &[&str], factory: ProviderFactory| {
            registry.backends.push(Backend {
                id: id.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                factory,
            });
        };

        register(
            &mut registry,
            "hf",
            &["local"],
            Arc::new(|config: &Config| {
                let hf = &config.embeddings.hf;
                let mut provider = EndpointProvider::new(
                    hf.url(),
                    hf.model(),
                    http::api_key(hf.token_env()),
                    config.http.timeout(),
                )?;
                if hf.token_env.is_some() {
                    provider = provider.require_token(hf.token_env());
                }
                Ok(Box::new(provider) as Box<dyn EmbeddingProvider>)
            }),
        );
        register(
            &mut registry,
            "gemini",
            &["cloud"],
            Arc::new(|config: &Config| {
                let gemini = &config.embeddings.gemini;
                let provider = GeminiProvider::new(
                    gemini.base_url(),
                    gemini.model(),
                    gemini.api_key_env(),
                    config.http.timeout(),
                )?;
                Ok(Box::new(provider) as Box<dyn EmbeddingProvider>)
            }),
        );
        register(
            &mut registry,
            "hashing",
            &[],
            Arc::new(|config: &Config| {
                let provider = HashingProvider::new(config.embeddings.hashing.dimension());
                Ok(Box::new(provider) as Box<dyn EmbeddingProvider>)
            }),
        );

        registry
    }

    /// Adds a backend. Fails on an invalid or already registered id or alias.
    pub fn register<F>(&mut self, id: &str, aliases: &[&str], factory: F) -> Result<(), Error>
    where
        F: Fn(&Config) -> Result<Box<dyn EmbeddingProvider>, EmbeddingError> + Send + Sync + 'static,
    {
        for name in std::iter::once(&id).chain(aliases.iter()) {
            if !is_valid_backend_id(name) {
                return Err(Error::Config(format!(
                    "backend id '{}' must match [a-z0-9_-]+",
                    name
                )));
            }
            if self.resolve(name).is_some() {
                return Err(Error::Config(format!("backend '{}' is already registered", name)));
            }
        }

        self.backends.push(Backend {
            id: id.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            factory: Arc::new(factory),
        });
        Ok(())
    }

    /// Looks up a backend by id or alias, ignoring case and surrounding whitespace.
    pub fn resolve(&self, token: &str) -> Option<&Backend> {
        let token = token.trim().to_lowercase();
        self.backends.iter().find(|b| b.matches(&token))
    }

    /// Canonical ids in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.id()).collect()
    }
}
