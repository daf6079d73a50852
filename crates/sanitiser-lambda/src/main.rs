use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use aws_config::BehaviorVersion;
use lambda_runtime::{LambdaEvent, service_fn};
use sanitiser_core::{BatchReport, HandlerConfig, SanitiserHandler};
use sanitiser_s3_storage::S3ObjectStore;
use serde_json::Value;
use tokio::time::Instant;

/// Time kept back from the invocation deadline for the response and log flush
const DEADLINE_MARGIN: Duration = Duration::from_secs(2);

type Handler = SanitiserHandler<S3ObjectStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_current_span(false)
        .without_time()
        .init();

    let config = HandlerConfig::from_env().context("loading handler configuration")?;
    tracing::info!(
        destination_bucket = %config.destination_bucket,
        max_concurrency = config.max_concurrency,
        "starting image sanitiser"
    );

    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let store = Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::new(&aws)));
    let handler = Arc::new(SanitiserHandler::new(store, config));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        async move { handle(&handler, event).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}

async fn handle(
    handler: &Handler,
    event: LambdaEvent<Value>,
) -> Result<BatchReport, lambda_runtime::Error> {
    let (payload, context) = event.into_parts();
    let remaining = remaining_budget(context.deadline, epoch_millis(), DEADLINE_MARGIN);
    tracing::debug!(
        request_id = %context.request_id,
        remaining_ms = remaining.as_millis() as u64,
        "invocation"
    );

    let report = handler
        .handle_payload(&payload, Some(Instant::now() + remaining))
        .await?;
    Ok(report)
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Time left to start new records, given the deadline and clock in epoch milliseconds
fn remaining_budget(deadline_ms: u64, now_ms: u64, margin: Duration) -> Duration {
    Duration::from_millis(deadline_ms.saturating_sub(now_ms)).saturating_sub(margin)
}
