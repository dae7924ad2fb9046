//! Worker configuration loaded from environment variables.

use std::time::Duration;

use lemma_checker::client::CheckerConfig;
use lemma_llm::client::LlmConfig;

/// Prompt-template provider settings.
#[derive(Debug, Clone)]
pub struct PromptProviderConfig {
    pub base_url: String,
    pub api_key: String,
    /// How long a cached template stays fresh.
    pub refresh: Duration,
}

/// Observability collaborator settings. Absent means tracing is off.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Full worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent claim loops (default: `4`).
    pub concurrency: usize,
    /// Idle delay between claim attempts (default: `1` second).
    pub poll_interval: Duration,
    /// Claim lease; an expired lease makes the submission reclaimable
    /// (default: `300` seconds).
    pub claim_lease: Duration,
    /// Delay between lease sweeps (default: `30` seconds).
    pub sweep_interval: Duration,
    pub llm: LlmConfig,
    pub checker: CheckerConfig,
    pub prompts: PromptProviderConfig,
    pub trace: Option<TraceConfig>,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                | Default  |
    /// |------------------------|----------|
    /// | `WORKER_CONCURRENCY`   | `4`      |
    /// | `POLL_INTERVAL_SECS`   | `1`      |
    /// | `CLAIM_LEASE_SECS`     | `300`    |
    /// | `SWEEP_INTERVAL_SECS`  | `30`     |
    /// | `LLM_BASE_URL`         | required |
    /// | `LLM_API_KEY`          | required |
    /// | `LLM_MODEL`            | required |
    /// | `LLM_TIMEOUT_SECS`     | `120`    |
    /// | `CHECKER_BASE_URL`     | required |
    /// | `CHECKER_TIMEOUT_SECS` | `120`    |
    /// | `PROMPTS_BASE_URL`     | required |
    /// | `PROMPTS_API_KEY`      | required |
    /// | `PROMPT_REFRESH_SECS`  | `3600`   |
    /// | `TRACE_BASE_URL`       | optional |
    /// | `TRACE_API_KEY`        | optional |
    pub fn from_env() -> Self {
        let llm = LlmConfig {
            base_url: require("LLM_BASE_URL"),
            api_key: require("LLM_API_KEY"),
            model: require("LLM_MODEL"),
            timeout: Duration::from_secs(parse_u64("LLM_TIMEOUT_SECS", 120)),
        };

        let checker = CheckerConfig {
            base_url: require("CHECKER_BASE_URL"),
            timeout: Duration::from_secs(parse_u64("CHECKER_TIMEOUT_SECS", 120)),
        };

        let prompts = PromptProviderConfig {
            base_url: require("PROMPTS_BASE_URL"),
            api_key: require("PROMPTS_API_KEY"),
            refresh: Duration::from_secs(parse_u64("PROMPT_REFRESH_SECS", 3600)),
        };

        let trace = match std::env::var("TRACE_BASE_URL") {
            Ok(base_url) if !base_url.is_empty() => Some(TraceConfig {
                base_url,
                api_key: std::env::var("TRACE_API_KEY").unwrap_or_default(),
            }),
            _ => None,
        };

        Self {
            concurrency: parse_u64("WORKER_CONCURRENCY", 4) as usize,
            poll_interval: Duration::from_secs(parse_u64("POLL_INTERVAL_SECS", 1)),
            claim_lease: Duration::from_secs(parse_u64("CLAIM_LEASE_SECS", 300)),
            sweep_interval: Duration::from_secs(parse_u64("SWEEP_INTERVAL_SECS", 30)),
            llm,
            checker,
            prompts,
            trace,
        }
    }
}

fn require(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}

fn parse_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .map(|value| {
            value
                .parse()
                .unwrap_or_else(|_| panic!("{name} must be a valid u64"))
        })
        .unwrap_or(default)
}
