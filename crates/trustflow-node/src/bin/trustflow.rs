//! The `trustflow` binary: wires C3 through C8 into one process and
//! runs until shutdown (spec.md §5's "one parent cancellation signal").

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;

use trustflow_anchor::{AnchorConfig, AnchorRunner, DevContentSink, DevLedgerSink};
use trustflow_ingest::{GithubGraphQlClient, IngestWorker, StaticTokenProvider, WorkQueueHandle};
use trustflow_node::NodeConfig;
use trustflow_storage::RedbBucketStore;
use trustflow_timeline::TimelineService;
use trustflow_web::{AlwaysManagedChecker, WebhookConfig, WebhookService};

const GITHUB_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    trustflow_telemetry::init_tracing().context("failed to initialize tracing")?;

    let config = NodeConfig::load().context("failed to load configuration")?;

    let store = Arc::new(
        RedbBucketStore::open(&config.storage_path)
            .with_context(|| format!("failed to open storage at {}", config.storage_path))?,
    );
    let timeline = Arc::new(TimelineService::new((*store).clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (queue_handle, queue_rx) = WorkQueueHandle::channel(config.queue_size);

    let provider = GithubGraphQlClient::with_default_timeout(GITHUB_GRAPHQL_ENDPOINT)
        .context("failed to build provider client")?;
    let tokens = StaticTokenProvider::new(config.provider_token.clone());
    let worker = Arc::new(IngestWorker::new(
        provider,
        tokens,
        Arc::clone(&timeline),
        queue_handle.clone(),
    ));
    let worker_handles =
        trustflow_ingest::spawn_pool(config.workers, queue_rx, worker, shutdown_rx.clone());

    // TODO: replace `AlwaysManagedChecker` with a real CRUD-collaborator
    // client once one exists; this dev stub treats every resource as
    // managed so C7 is exercisable end-to-end today.
    let webhook_service = Arc::new(WebhookService::new(
        WebhookConfig {
            secret: config.webhook_secret.clone(),
            exists_fail_open: config.exists_fail_open,
        },
        Arc::new(AlwaysManagedChecker),
        queue_handle,
    ));
    let webhook_listen_addr = config.webhook_listen_addr.clone();
    let webhook_shutdown = shutdown_rx.clone();
    let webhook_handle = tokio::spawn(async move {
        if let Err(err) =
            trustflow_web::run_server(&webhook_listen_addr, webhook_service, webhook_shutdown).await
        {
            tracing::error!(error = %err, "webhook front door failed");
        }
    });

    let anchor_runner = AnchorRunner::new(
        AnchorConfig {
            tick_interval: config.anchor_tick_interval,
            ..AnchorConfig::default()
        },
        Arc::clone(&store),
        Arc::new(DevContentSink),
        Arc::new(DevLedgerSink::default()),
    );
    let anchor_shutdown = shutdown_rx.clone();
    let anchor_handle = tokio::spawn(async move { anchor_runner.run(anchor_shutdown).await });

    let telemetry_addr = config
        .telemetry_listen_addr
        .parse()
        .context("invalid TELEMETRY_ADDR")?;
    let telemetry_shutdown = shutdown_rx.clone();
    let telemetry_handle =
        tokio::spawn(async move { trustflow_telemetry::run_server(telemetry_addr, telemetry_shutdown).await });

    tracing::info!(target = "trustflow", "node started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to install ctrl-c handler")?;
    tracing::info!(target = "trustflow", "shutdown signal received");
    let _ = shutdown_tx.send(true);

    for handle in worker_handles {
        let _ = handle.await;
    }
    let _ = webhook_handle.await;
    let _ = anchor_handle.await;
    let _ = telemetry_handle.await;

    tracing::info!(target = "trustflow", "shutdown complete");
    Ok(())
}
