use anyhow::Result;
use clap::Parser;
use op_deposit_db::PgDepositStore;
use op_deposit_indexer::Worker;
use op_deposit_providers_alloy::AlloyL1Provider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod broadcast;
mod cli;
mod metrics;
mod telemetry;

const LOG_TARGET: &str = "op-deposit-indexer";

#[actix_web::main]
async fn main() -> Result<()> {
    let cfg = cli::Cli::parse();
    telemetry::init_tracing_subscriber(cfg.v)?;

    let l1_rpc_url = reqwest::Url::parse(&cfg.optimism_l1_rpc)?;
    let l1: Arc<dyn op_deposit_indexer::traits::L1Provider> =
        Arc::new(AlloyL1Provider::new_http(l1_rpc_url));
    let store: Arc<dyn op_deposit_indexer::traits::DepositStore> =
        Arc::new(PgDepositStore::connect(&cfg.database_url).await?);
    let (broadcaster, _receiver) = broadcast::ChannelBroadcaster::new();
    let broadcaster: Arc<dyn op_deposit_indexer::traits::DepositBroadcaster> = Arc::new(broadcaster);

    let worker = Worker::bootstrap(&cfg.indexer_config(), l1, store, broadcaster).await?;

    let cancellation = CancellationToken::new();
    let shutdown = cancellation.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!(target: LOG_TARGET, "received shutdown signal, stopping worker");
        shutdown.cancel();
    });

    let metrics_addr = cfg.metrics_addr.clone();
    let run_handle = tokio::spawn(async move { worker.run(cancellation).await });

    tokio::select! {
        res = metrics::serve_metrics(&metrics_addr) => {
            error!(target: LOG_TARGET, "metrics server exited: {:?}", res);
            res
        }
        val = run_handle => {
            match val {
                Ok(Ok(())) => {
                    info!(target: LOG_TARGET, "worker stopped cleanly");
                    Ok(())
                }
                Ok(Err(e)) => {
                    error!(target: LOG_TARGET, error = %e, "worker exited with a fatal error");
                    anyhow::bail!("worker failed: {e}");
                }
                Err(e) => {
                    error!(target: LOG_TARGET, "worker task panicked: {:?}", e);
                    anyhow::bail!("worker task panicked: {e}");
                }
            }
        }
    }
}
