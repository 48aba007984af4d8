//! The reconciliation pipeline.
//!
//! One long-lived worker per process wakes on a fixed interval and sweeps the unaccrued backlog through three
//! pipelined stages: a feeder that hands the discovered orders over one at a time, a fetch stage that asks the
//! accrual service for a verdict on each, and a persist stage that applies verdicts to the ledger. The stages are
//! connected by bounded channels, so classification of one order overlaps persistence of the previous one without
//! unbounded buffering. No stage blocks a sibling order: every per-order failure is logged and the order stays in
//! the backlog for the next tick.
//!
//! The worker assumes it is the only poller instance running against the store. A second instance would not
//! double-credit (verdict application is replay-safe), but it would waste rate-limited lookups.
use log::*;
use loyalty_engine::{
    db_types::{Order, Verdict},
    LedgerDatabase, LedgerError, SqliteDatabase,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    accrual::{AccrualClient, AccrualSource, Classification},
    config::ReconcilerConfig,
    rate_gate::RateGate,
};

/// How many orders may sit between two stages before the upstream stage blocks.
const PIPELINE_DEPTH: usize = 8;

/// Starts the reconciliation worker. Do not await the returned JoinHandle other than after signalling shutdown,
/// as it runs until the shutdown channel fires.
pub fn start_accrual_poller(
    db: SqliteDatabase,
    client: AccrualClient,
    config: &ReconcilerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let poll_interval = config.poll_interval;
    tokio::spawn(async move {
        let gate = RateGate::new();
        let mut timer = tokio::time::interval(poll_interval);
        let tick_shutdown = shutdown.clone();
        info!("🔁️ Accrual reconciliation worker started (every {poll_interval:?})");
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = timer.tick() => {
                    if let Err(e) = run_tick(&db, &client, &gate, &tick_shutdown).await {
                        error!("🔁️ Could not fetch the unaccrued backlog: {e}. Skipping this tick");
                    }
                },
            }
        }
        info!("🔁️ Accrual reconciliation worker stopped");
    })
}

/// One sweep of the backlog. Only the discovery query can fail the tick as a whole; everything downstream is
/// contained per order.
pub async fn run_tick<B, S>(
    db: &B,
    source: &S,
    gate: &RateGate,
    shutdown: &watch::Receiver<bool>,
) -> Result<(), LedgerError>
where
    B: LedgerDatabase,
    S: AccrualSource,
{
    let backlog = db.list_unaccrued().await?;
    if backlog.is_empty() {
        trace!("🔁️ Nothing to reconcile");
        return Ok(());
    }
    debug!("🔁️ Reconciling {} unaccrued orders", backlog.len());

    let (order_tx, mut order_rx) = mpsc::channel::<Order>(PIPELINE_DEPTH);
    let (verdict_tx, mut verdict_rx) = mpsc::channel::<Verdict>(PIPELINE_DEPTH);

    let mut feeder_shutdown = shutdown.clone();
    let feeder = async move {
        for order in backlog {
            if *feeder_shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = feeder_shutdown.changed() => break,
                sent = order_tx.send(order) => {
                    if sent.is_err() {
                        break;
                    }
                },
            }
        }
        // order_tx drops here, closing the hand-off so the fetch stage can drain and exit.
    };

    let fetch = async {
        while let Some(order) = order_rx.recv().await {
            if *shutdown.borrow() {
                continue;
            }
            if gate.is_closed() {
                debug!("⏳️ Throttled. Order [{}] skipped this cycle", order.number);
                continue;
            }
            match source.classify(&order).await {
                Ok(Classification::Verdict(verdict)) => {
                    if verdict_tx.send(verdict).await.is_err() {
                        break;
                    }
                },
                Ok(Classification::NotRegistered) => {
                    trace!("🔎️ Order [{}] is not registered with the accrual service yet", order.number);
                },
                Ok(Classification::Throttled(cooldown)) => {
                    gate.arm(cooldown, shutdown.clone());
                },
                Err(e) => {
                    warn!("🔎️ Classification failed for order [{}]: {e}. It stays in the backlog", order.number);
                },
            }
        }
        drop(verdict_tx);
    };

    let persist = async {
        while let Some(verdict) = verdict_rx.recv().await {
            match db.apply_verdict(&verdict).await {
                Ok(order) => info!("💳️ Order [{}] settled as {}", order.number, order.status),
                Err(LedgerError::InsufficientBalance(user_id)) => {
                    // A credit can never overdraw; seeing this means a verdict was applied twice somewhere.
                    error!(
                        "💳️ Balance constraint rejected a credit for user #{user_id} (order [{}]). This indicates \
                         a double-application bug",
                        verdict.number
                    );
                },
                Err(e) => {
                    warn!("💳️ Could not apply the verdict for order [{}]: {e}. It will be retried", verdict.number);
                },
            }
        }
    };

    tokio::join!(feeder, fetch, persist);
    Ok(())
}
