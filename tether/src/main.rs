#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::process::ExitCode;

use args::{Args, Command};
use clap::Parser;
use serde_json::{Value, json};
use tether_client::{ApiClient, ApiClientBuilder};
use tether_config::{Config, EnvConfig};
use tether_core::ApiError;
use tether_query::{QueryClient, QueryKey};

/// Exit code after Ctrl+C, as shells report it
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Fail fast on a bad environment before anything else starts
    let env = EnvConfig::from_env()?;
    let config = Config::for_env(&env)?;

    tether_telemetry::init(&config.telemetry, args.log_filter.as_deref())?;

    tracing::debug!(
        api_url = %env.api_url,
        environment = ?env.environment,
        mocking = env.enable_api_mocking,
        "configuration loaded"
    );

    let mut builder = ApiClientBuilder::from_config(&env, &config)?;
    if let Some(timeout) = args.timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder.build()?;
    let queries = QueryClient::from_config(&config.query);

    let outcome = tokio::select! {
        outcome = run(&client, &queries, &env, &config, args.command) => outcome,
        () = shutdown_signal() => return Ok(ExitCode::from(INTERRUPTED)),
    };

    match outcome {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln!("{}", serde_json::to_string_pretty(&error.to_json())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(
    client: &ApiClient,
    queries: &QueryClient,
    env: &EnvConfig,
    config: &Config,
    command: Command,
) -> Result<Value, ApiError> {
    match command {
        Command::Get { path } => {
            queries
                .fetch(QueryKey::from(path.as_str()), || client.get::<Value>(&path))
                .await
        }
        Command::Delete { path } => queries.mutate(|| client.delete(&path)).await,
        Command::Post(body) => queries.mutate(|| client.post(&body.path, &body.data)).await,
        Command::Put(body) => queries.mutate(|| client.put(&body.path, &body.data)).await,
        Command::Patch(body) => queries.mutate(|| client.patch(&body.path, &body.data)).await,
        Command::CheckConfig => Ok(effective_settings(env, config)),
    }
}

/// Effective settings with secrets left out
fn effective_settings(env: &EnvConfig, config: &Config) -> Value {
    let tokens = if env.uses_mock_tokens() { "mock" } else { "identity-provider" };

    json!({
        "api_url": env.api_url.as_str(),
        "app_url": env.app_url.as_str(),
        "environment": format!("{:?}", env.environment).to_lowercase(),
        "api_mocking": env.enable_api_mocking,
        "mock_api_port": env.mock_api_port,
        "tokens": tokens,
        "csrf": config.csrf.enabled.then(|| json!({
            "header": config.csrf.header_name,
            "cookie": config.csrf.cookie_name,
        })),
        "login_route": config.session.login_route,
        "query": {
            "retry": config.query.retry,
            "stale_time_secs": config.query.stale_time.as_secs(),
            "refetch_on_focus": config.query.refetch_on_focus,
        },
    })
}

/// Wait for `SIGINT` or `SIGTERM`
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("interrupted, abandoning request");
}
