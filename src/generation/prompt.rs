// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt template with `{context}` and `{query}` placeholders.

use std::path::Path;

use crate::telemetry::Telemetry;

/// Template used when no usable template file is available.
pub const FALLBACK_TEMPLATE: &str = "Context: {context}\n\nQuestion: {query}\n\n";

const CONTEXT: &str = "{context}";
const QUERY: &str = "{query}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: FALLBACK_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Template from a string. Returns `None` if it lacks `{query}`.
    pub fn new(template: impl Into<String>) -> Option<Self> {
        let template = template.into();
        template.contains(QUERY).then_some(Self { template })
    }

    /// Reads the template at `path`, or falls back to [`FALLBACK_TEMPLATE`]
    /// when the file is missing, unreadable or has no `{query}` placeholder.
    pub fn load_or_fallback(path: &Path, telemetry: &Telemetry) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::new(content).unwrap_or_else(|| {
                telemetry.warn(format!(
                    "Prompt template {} has no {} placeholder, using fallback",
                    path.display(),
                    QUERY
                ));
                Self::default()
            }),
            Err(e) => {
                telemetry.warn(format!(
                    "Prompt template {} not loaded ({}), using fallback",
                    path.display(),
                    e
                ));
                Self::default()
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitutes both placeholders in one left-to-right pass, so placeholder
    /// text inside `context` or `query` is left alone.
    pub fn render(&self, context: &str, query: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + query.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix(CONTEXT) {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUERY) {
                out.push_str(query);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}
