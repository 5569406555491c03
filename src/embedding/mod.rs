// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - turns text into vectors
//!
//! Provides the [`EmbeddingProvider`] trait, the concrete HTTP and offline
//! backends, and the registry that resolves a backend selector to a provider.

pub mod endpoint;
pub mod gemini;
pub mod provider;
pub mod registry;

pub use endpoint::EndpointProvider;
pub use gemini::GeminiProvider;
pub use provider::{EmbeddingProvider, HashingProvider};
pub use registry::{is_valid_backend_id, Backend, BackendRegistry, ProviderFactory};
