// SPDX-License-Identifier: MIT OR Apache-2.0

//! Answer generation
//!
//! Retrieves context for a question, renders the prompt template and invokes
//! the model chain. Generation never fails outward: when every model fails
//! the caller receives [`APOLOGY`].

pub mod gemini;
pub mod model;
pub mod openai;
pub mod prompt;

use std::sync::Arc;

use crate::document::{RetrievalResult, ScoredChunk};
use crate::retriever::Retrieve;
use crate::telemetry::Telemetry;

pub use gemini::GeminiModel;
pub use model::{build_model, Generated, LanguageModel, ModelChain};
pub use openai::OpenAiCompatibleModel;
pub use prompt::{PromptTemplate, FALLBACK_TEMPLATE};

/// Returned when no model produced an answer.
pub const APOLOGY: &str = "I'm sorry, an error occurred. Please try again later.";

/// Joins chunk texts in ranked order, separated by blank lines.
pub fn format_docs(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: RetrievalResult,
    /// Model that answered; `None` when the apology was returned.
    pub model: Option<String>,
}

pub struct GenerationChain {
    retriever: Arc<dyn Retrieve>,
    template: PromptTemplate,
    models: ModelChain,
    telemetry: Telemetry,
}

impl GenerationChain {
    pub fn new(
        retriever: Arc<dyn Retrieve>,
        template: PromptTemplate,
        models: ModelChain,
        telemetry: &Telemetry,
    ) -> Self {
        Self {
            retriever,
            template,
            models,
            telemetry: telemetry.scoped("generation"),
        }
    }

    /// Answers `question` from retrieved context.
    pub fn answer(&self, question: &str) -> Answer {
        let sources = self.retriever.retrieve(question);
        let prompt = self.template.render(&format_docs(&sources), question);

        match self.models.invoke(&prompt) {
            Some(generated) => Answer {
                text: generated.text,
                sources,
                model: Some(generated.model),
            },
            None => {
                self.telemetry.critical(format!(
                    "All {} language models failed to answer",
                    self.models.len()
                ));
                Answer {
                    text: APOLOGY.to_string(),
                    sources,
                    model: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::model::tests::ScriptedModel;
    use super::*;
    use crate::document::Metadata;
    use crate::telemetry::Level;

    struct FixedRetriever(Vec<&'static str>);

    impl Retrieve for FixedRetriever {
        fn retrieve(&self, _query: &str) -> RetrievalResult {
            self.0
                .iter()
                .enumerate()
                .map(|(i, text)| ScoredChunk {
                    id: i.to_string(),
                    text: text.to_string(),
                    metadata: Metadata::new(),
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect()
        }
    }

    #[test]
    fn test_format_docs_keeps_rank_order() {
        let chunks = FixedRetriever(vec!["first", "second"]).retrieve("q");
        assert_eq!(format_docs(&chunks), "first\n\nsecond");
        assert_eq!(format_docs(&[]), "");
    }

    #[test]
    fn test_prompt_carries_context_and_question() {
        let primary = ScriptedModel::ok("primary", "Apply online.");
        let prompts = primary.prompts.clone();
        let chain = GenerationChain::new(
            Arc::new(FixedRetriever(vec!["Admissions info: apply online."])),
            PromptTemplate::default(),
            ModelChain::new(vec![Box::new(primary)], &Telemetry::new()),
            &Telemetry::new(),
        );

        let answer = chain.answer("How do I apply?");
        assert_eq!(answer.text, "Apply online.");
        assert_eq!(answer.model.as_deref(), Some("primary"));
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(
            prompts.lock().unwrap()[0],
            "Context: Admissions info: apply online.\n\nQuestion: How do I apply?\n\n"
        );
    }

    #[test]
    fn test_total_failure_returns_apology() {
        let telemetry = Telemetry::capturing();
        let chain = GenerationChain::new(
            Arc::new(FixedRetriever(vec!["ctx"])),
            PromptTemplate::default(),
            ModelChain::new(
                vec![
                    Box::new(ScriptedModel::failing("primary")),
                    Box::new(ScriptedModel::failing("fallback")),
                ],
                &telemetry,
            ),
            &telemetry,
        );

        let answer = chain.answer("q");
        assert_eq!(answer.text, APOLOGY);
        assert!(answer.model.is_none());
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(telemetry.messages(Level::Critical).len(), 1);
    }
}
