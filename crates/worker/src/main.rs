use std::sync::Arc;

use lemma_checker::CheckerClient;
use lemma_core::retry::RetryPolicy;
use lemma_core::store::{ProblemCatalog, SubmissionStore};
use lemma_db::store::PgStore;
use lemma_llm::{LlmClient, PromptManager, TraceSink};
use lemma_pipeline::{ModelService, ProofChecker, SubmissionPipeline, TemplateStore};
use lemma_worker::{Dispatcher, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lemma_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();
    tracing::info!(concurrency = config.concurrency, "Loaded worker configuration");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = lemma_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    lemma_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection pool created");

    let store = Arc::new(PgStore::new(pool));

    let llm = LlmClient::new(config.llm.clone()).expect("Failed to build LLM client");
    let checker =
        CheckerClient::new(config.checker.clone()).expect("Failed to build checker client");
    let prompts = PromptManager::new(
        config.prompts.base_url.clone(),
        config.prompts.api_key.clone(),
        config.prompts.refresh,
    )
    .expect("Failed to build prompt manager");

    let tracer = match &config.trace {
        Some(trace) => TraceSink::new(trace.base_url.clone(), trace.api_key.clone()),
        None => TraceSink::disabled(),
    };

    let pipeline = Arc::new(SubmissionPipeline::new(
        Arc::new(llm) as Arc<dyn ModelService>,
        Arc::new(checker) as Arc<dyn ProofChecker>,
        Arc::new(prompts) as Arc<dyn TemplateStore>,
        tracer,
        RetryPolicy::default(),
    ));

    let dispatcher = Dispatcher::new(
        Arc::clone(&store) as Arc<dyn SubmissionStore>,
        store as Arc<dyn ProblemCatalog>,
        pipeline,
        config.concurrency,
        config.poll_interval,
        config.claim_lease,
        config.sweep_interval,
    );

    let cancel = tokio_util::sync::CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_cancel.cancel();
    });

    dispatcher.run(cancel).await;
    tracing::info!("Worker exited cleanly");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
