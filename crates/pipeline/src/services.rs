//! Seam traits between the pipeline and its external services.
//!
//! The concrete clients from `lemma-llm` and `lemma-checker` implement
//! these traits; tests substitute deterministic fakes.

use async_trait::async_trait;
use lemma_checker::{parse_report, CheckerClient};
use lemma_core::verdict::VerificationReport;
use lemma_llm::{LlmClient, LlmError, PromptManager, PromptTemplate};

/// How a service call failed, as far as retry classification cares.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Timeout, connection failure, 5xx. Worth retrying.
    #[error("transient service failure: {0}")]
    Transient(String),

    /// The service rejected the request itself (auth, malformed
    /// payload). Retrying cannot help.
    #[error("service rejected the request: {0}")]
    Rejected(String),

    /// The checker rejected the submitted script outright. Permanent,
    /// attributed to the script rather than the service.
    #[error("service rejected the script: {0}")]
    ScriptRejected(String),
}

/// The language-model service.
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn complete(&self, prompt: &str, idempotency_key: &str)
        -> Result<String, ServiceError>;

    /// Model identifier, for trace records.
    fn model(&self) -> &str {
        "unknown"
    }
}

/// The proof-checker service.
#[async_trait]
pub trait ProofChecker: Send + Sync {
    async fn check(
        &self,
        script: &str,
        idempotency_key: &str,
    ) -> Result<VerificationReport, ServiceError>;
}

/// The prompt-template provider.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<PromptTemplate, ServiceError>;
}

fn classify_llm(err: LlmError) -> ServiceError {
    if err.is_transient() {
        ServiceError::Transient(err.to_string())
    } else {
        ServiceError::Rejected(err.to_string())
    }
}

#[async_trait]
impl ModelService for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        idempotency_key: &str,
    ) -> Result<String, ServiceError> {
        LlmClient::complete(self, prompt, idempotency_key)
            .await
            .map_err(classify_llm)
    }

    fn model(&self) -> &str {
        LlmClient::model(self)
    }
}

#[async_trait]
impl ProofChecker for CheckerClient {
    async fn check(
        &self,
        script: &str,
        idempotency_key: &str,
    ) -> Result<VerificationReport, ServiceError> {
        match CheckerClient::check(self, script, idempotency_key).await {
            Ok(response) => Ok(parse_report(&response)),
            Err(err) if err.is_script_rejection() => {
                Err(ServiceError::ScriptRejected(err.to_string()))
            }
            Err(err) if err.is_transient() => Err(ServiceError::Transient(err.to_string())),
            Err(err) => Err(ServiceError::Rejected(err.to_string())),
        }
    }
}

#[async_trait]
impl TemplateStore for PromptManager {
    async fn get(&self, name: &str) -> Result<PromptTemplate, ServiceError> {
        PromptManager::get(self, name).await.map_err(classify_llm)
    }
}
