use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlagent::config::Config;
use sqlagent::console::ConsoleObserver;
use sqlagent::{build_sql_agent, run_prompts};
use sqlagent_agent::ToolFailurePolicy;
use sqlagent_core::{Backoff, CallbackManager, TracingHandler};
use sqlagent_llm::OpenAiCompatibleClient;
use sqlagent_memory::InMemoryHistoryStore;
use sqlagent_tools::{SqlDatabase, SqlToolkit};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sqlagent=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    init_tracing();
    tracing::debug!(?config, "starting");

    let database = SqlDatabase::connect(&config.database)
        .await
        .with_context(|| format!("failed to open {}", config.database))?;
    let toolkit = SqlToolkit::new(database, &config.report_dir);

    let client = OpenAiCompatibleClient::builder()
        .base_url(&config.base_url)?
        .api_key(config.api_key.clone())
        .default_model(config.model.clone())
        .timeout(config.model_timeout())
        .build()?;

    let mut callbacks = CallbackManager::new(vec![Arc::new(TracingHandler)]);
    if !config.quiet {
        callbacks.add_handler(Arc::new(ConsoleObserver::stdout()));
    }

    let store = Arc::new(InMemoryHistoryStore::new());
    let tool_timeout = config.tool_timeout();
    let agent = build_sql_agent(client, &toolkit, store, |builder| {
        let builder = builder
            .model(config.model.clone())
            .max_iterations(config.max_iterations)
            .model_retries(config.model_attempts, Backoff::default())
            .tool_failure_policy(ToolFailurePolicy::ReportToModel)
            .callbacks(callbacks);
        match tool_timeout {
            Some(timeout) => builder.tool_timeout(timeout),
            None => builder,
        }
    })
    .await?;

    let prompts = config.prompts();
    let results = run_prompts(&agent, &prompts, &config.session).await;
    toolkit.database().close().await;

    let mut failed = 0;
    for (prompt, result) in prompts.iter().zip(results) {
        match result {
            Ok(outcome) => {
                tracing::info!(iterations = outcome.iterations, "turn complete");
                println!("{}", outcome.output);
            }
            Err(err) => {
                failed += 1;
                eprintln!("turn failed for {prompt:?}: {err}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} turns failed", prompts.len());
    }
    Ok(())
}
