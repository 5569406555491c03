// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language model interface and the ordered fallback chain.

use std::time::Duration;

use super::gemini::GeminiModel;
use super::openai::OpenAiCompatibleModel;
use crate::config::{ModelConfig, ModelProvider};
use crate::errors::ModelError;
use crate::telemetry::Telemetry;

/// A text-in, text-out language model.
pub trait LanguageModel: Send + Sync {
    /// Name used in logs and responses.
    fn name(&self) -> &str;

    /// Generates a completion for `prompt`. Returns the raw text; the chain
    /// trims it and treats empty text as a failure.
    fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Builds the model described by one `[[generation.models]]` entry.
pub fn build_model(
    config: &ModelConfig,
    timeout: Duration,
) -> Result<Box<dyn LanguageModel>, ModelError> {
    Ok(match config.provider {
        ModelProvider::Gemini => Box::new(GeminiModel::new(
            config.base_url(),
            &config.model,
            config.api_key_env(),
            config.temperature(),
            timeout,
        )?),
        ModelProvider::Openai => Box::new(OpenAiCompatibleModel::new(
            config.base_url(),
            &config.model,
            config.api_key_env(),
            config.temperature(),
            timeout,
        )?),
    })
}

/// Text produced by one model of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub model: String,
}

/// Candidates tried strictly in order with the identical prompt.
pub struct ModelChain {
    models: Vec<Box<dyn LanguageModel>>,
    telemetry: Telemetry,
}

impl ModelChain {
    pub fn new(models: Vec<Box<dyn LanguageModel>>, telemetry: &Telemetry) -> Self {
        Self {
            models,
            telemetry: telemetry.scoped("generation"),
        }
    }

    /// Chain built from configured candidates.
    pub fn from_config(
        configs: &[ModelConfig],
        timeout: Duration,
        telemetry: &Telemetry,
    ) -> Result<Self, ModelError> {
        let models = configs
            .iter()
            .map(|c| build_model(c, timeout))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(models, telemetry))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Names in invocation order.
    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// First non-empty completion, or `None` once every candidate failed.
    /// Each failure is logged together with the candidate tried next.
    pub fn invoke(&self, prompt: &str) -> Option<Generated> {
        for (i, model) in self.models.iter().enumerate() {
            let result = model.generate(prompt).and_then(|text| {
                let text = text.trim();
                if text.is_empty() {
                    Err(ModelError::EmptyResponse)
                } else {
                    Ok(text.to_string())
                }
            });

            match result {
                Ok(text) => {
                    if i > 0 {
                        self.telemetry
                            .info(format!("Fallback model {} answered", model.name()));
                    }
                    return Some(Generated {
                        text,
                        model: model.name().to_string(),
                    });
                }
                Err(e) => {
                    let tier = if i == 0 { "Primary" } else { "Fallback" };
                    match self.models.get(i + 1) {
                        Some(next) => self.telemetry.error(format!(
                            "{} LLM error ({}): {}. Triggering fallback to {}",
                            tier,
                            model.name(),
                            e,
                            next.name()
                        )),
                        None => self.telemetry.error(format!(
                            "{} LLM error ({}): {}",
                            tier,
                            model.name(),
                            e
                        )),
                    }
                }
            }
        }
        None
    }
}
