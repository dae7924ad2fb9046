//! Named, versioned prompt templates from the prompt provider.
//!
//! Templates are fetched over HTTP, cached in memory, and refreshed
//! once the cache entry goes stale. A failed refresh keeps serving the
//! last known version so a provider outage does not stop the pipeline.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::client::LlmError;

/// Template for the guardrail proof-attempt check.
pub const TEMPLATE_GUARDRAIL: &str = "guardrail_check";

/// Template for LaTeX-to-formal-script conversion.
pub const TEMPLATE_LATEX_TO_FORMAL: &str = "latex_to_formal";

/// Template for user feedback generation.
pub const TEMPLATE_FEEDBACK: &str = "feedback_generation";

/// A named, versioned prompt template.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub version: i32,
    pub prompt: String,
    /// Provider-side model/config hints; passed through untouched.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl PromptTemplate {
    /// Substitute `{{key}}` placeholders with the given values.
    pub fn compile(&self, vars: &[(&str, &str)]) -> String {
        let mut text = self.prompt.clone();
        for (key, value) in vars {
            text = text.replace(&format!("{{{{{key}}}}}"), value);
        }
        text
    }
}

struct CachedTemplate {
    template: PromptTemplate,
    fetched_at: Instant,
}

/// Fetches and caches prompt templates.
pub struct PromptManager {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedTemplate>>,
}

impl PromptManager {
    /// Default cache lifetime: one hour.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    pub fn new(base_url: String, api_key: String, ttl: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Build(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key,
            ttl,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Get a template by name, from cache when fresh.
    ///
    /// When the provider cannot be reached and a stale copy exists, the
    /// stale copy is served and a warning logged.
    pub async fn get(&self, name: &str) -> Result<PromptTemplate, LlmError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(name) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.template.clone());
                }
            }
        }

        match self.fetch(name).await {
            Ok(template) => {
                let mut cache = self.cache.write().await;
                cache.insert(
                    name.to_string(),
                    CachedTemplate {
                        template: template.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Ok(template)
            }
            Err(err) => {
                let cache = self.cache.read().await;
                if let Some(entry) = cache.get(name) {
                    tracing::warn!(
                        template = name,
                        error = %err,
                        "Prompt refresh failed, serving cached version",
                    );
                    return Ok(entry.template.clone());
                }
                Err(err)
            }
        }
    }

    async fn fetch(&self, name: &str) -> Result<PromptTemplate, LlmError> {
        let response = self
            .http
            .get(format!("{}/api/v2/prompts/{name}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::Connect(e.to_string())
                } else {
                    LlmError::InvalidResponse(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }

        response
            .json::<PromptTemplate>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(prompt: &str) -> PromptTemplate {
        PromptTemplate {
            name: "t".to_string(),
            version: 1,
            prompt: prompt.to_string(),
            config: serde_json::Value::Null,
        }
    }

    #[test]
    fn compile_substitutes_placeholders() {
        let t = template("Problem: {{problem}}\nSolution: {{solution}}");
        let compiled = t.compile(&[("problem", "P"), ("solution", "S")]);
        assert_eq!(compiled, "Problem: P\nSolution: S");
    }

    #[test]
    fn compile_substitutes_repeated_placeholders() {
        let t = template("{{x}} and {{x}}");
        assert_eq!(t.compile(&[("x", "a")]), "a and a");
    }

    #[test]
    fn compile_leaves_unknown_placeholders() {
        let t = template("{{known}} {{unknown}}");
        assert_eq!(t.compile(&[("known", "v")]), "v {{unknown}}");
    }

    #[test]
    fn template_deserializes_without_config() {
        let t: PromptTemplate = serde_json::from_str(
            r#"{"name": "latex_to_formal", "version": 4, "prompt": "Convert {{solution}}"}"#,
        )
        .unwrap();
        assert_eq!(t.version, 4);
        assert!(t.config.is_null());
    }
}
