//! Static provider catalog
//!
//! The selectable model identifiers exposed to clients. The catalog is
//! process-wide and read-only; it exists to validate a caller-supplied model
//! selection and to supply the configured default when the selection is
//! missing or unknown.

use serde::Serialize;

/// One selectable model
#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    pub description: &'static str,
}

/// All selectable models
pub const AVAILABLE_MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: "openai/gpt-4o",
        name: "GPT-4o",
        provider: "OpenAI",
        description: "Most capable OpenAI model",
    },
    ModelEntry {
        id: "openai/gpt-4o-mini",
        name: "GPT-4o Mini",
        provider: "OpenAI",
        description: "Fast & affordable",
    },
    ModelEntry {
        id: "anthropic/claude-3.5-sonnet",
        name: "Claude 3.5 Sonnet",
        provider: "Anthropic",
        description: "Excellent reasoning",
    },
    ModelEntry {
        id: "anthropic/claude-3-haiku",
        name: "Claude 3 Haiku",
        provider: "Anthropic",
        description: "Fast & lightweight",
    },
    ModelEntry {
        id: "google/gemini-pro-1.5",
        name: "Gemini Pro 1.5",
        provider: "Google",
        description: "Large context window",
    },
    ModelEntry {
        id: "google/gemini-flash-1.5",
        name: "Gemini Flash 1.5",
        provider: "Google",
        description: "Ultra-fast responses",
    },
    ModelEntry {
        id: "meta-llama/llama-3.1-70b-instruct",
        name: "Llama 3.1 70B",
        provider: "Meta",
        description: "Open-source powerhouse",
    },
    ModelEntry {
        id: "mistralai/mistral-large",
        name: "Mistral Large",
        provider: "Mistral",
        description: "Strong multilingual",
    },
];

/// Resolve a caller-supplied model id against the catalog, falling back to
/// the configured default for missing or unknown identifiers.
pub fn resolve(requested: Option<&str>, default_model: &str) -> String {
    match requested {
        Some(id) if AVAILABLE_MODELS.iter().any(|m| m.id == id) => id.to_string(),
        _ => default_model.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_model() {
        let model = resolve(Some("anthropic/claude-3-haiku"), "openai/gpt-4o");
        assert_eq!(model, "anthropic/claude-3-haiku");
    }

    #[test]
    fn test_resolve_unknown_model_uses_default() {
        let model = resolve(Some("definitely/not-a-model"), "openai/gpt-4o");
        assert_eq!(model, "openai/gpt-4o");
    }

    #[test]
    fn test_resolve_missing_model_uses_default() {
        let model = resolve(None, "openai/gpt-4o-mini");
        assert_eq!(model, "openai/gpt-4o-mini");
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        for (i, entry) in AVAILABLE_MODELS.iter().enumerate() {
            assert!(
                AVAILABLE_MODELS[i + 1..].iter().all(|m| m.id != entry.id),
                "duplicate id {}",
                entry.id
            );
        }
    }
}
