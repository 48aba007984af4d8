//! Shared throttle state for the accrual service.
//!
//! The service advertises a cooldown when it rejects us with "too many requests". The gate records that cooldown
//! once, process-wide: the first throttle signal wins, concurrent signals during an active cooldown are ignored
//! rather than extending it, and a single waiter task reopens the gate when the advertised duration elapses. The
//! gate is a plain atomic, never a lock, so observing a throttle never stalls another order's classification.
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::sync::watch;

#[derive(Clone, Debug, Default)]
pub struct RateGate {
    cooldown_secs: Arc<AtomicU64>,
}

impl RateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a cooldown is active. Callers skip their external call for the current cycle instead of queuing
    /// behind the gate.
    pub fn is_closed(&self) -> bool {
        self.cooldown_secs.load(Ordering::Acquire) > 0
    }

    /// Arms the gate with the advertised cooldown. Only the first signal wins: if a cooldown is already active
    /// the call is a no-op and returns `false`. The winner spawns the single waiter task that reopens the gate
    /// after the cooldown elapses, unless the shutdown signal fires first.
    pub fn arm(&self, cooldown: Duration, mut shutdown: watch::Receiver<bool>) -> bool {
        let secs = cooldown.as_secs().max(1);
        if self.cooldown_secs.compare_exchange(0, secs, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return false;
        }
        info!("⏳️ The accrual service is throttling us. Holding external calls for {secs}s");
        let gate = self.cooldown_secs.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.changed() => {},
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    gate.store(0, Ordering::Release);
                    info!("⏳️ Throttle cooldown elapsed. External calls resume");
                },
            }
        });
        true
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::sync::watch;

    use super::RateGate;

    #[tokio::test(start_paused = true)]
    async fn first_signal_wins_and_cooldown_expires() {
        let (_tx, shutdown) = watch::channel(false);
        let gate = RateGate::new();
        assert!(!gate.is_closed());

        assert!(gate.arm(Duration::from_secs(60), shutdown.clone()));
        assert!(gate.is_closed());

        // A second signal while the cooldown is active must not extend it.
        assert!(!gate.arm(Duration::from_secs(600), shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!gate.is_closed());

        // Once reopened the gate can be armed again.
        assert!(gate.arm(Duration::from_secs(30), shutdown));
        assert!(gate.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_cooldown_still_closes_the_gate() {
        let (_tx, shutdown) = watch::channel(false);
        let gate = RateGate::new();
        assert!(gate.arm(Duration::from_secs(0), shutdown));
        assert!(gate.is_closed());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!gate.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_the_waiter() {
        let (tx, shutdown) = watch::channel(false);
        let gate = RateGate::new();
        assert!(gate.arm(Duration::from_secs(60), shutdown));
        tx.send(true).unwrap();
        tokio::task::yield_now().await;
        // The waiter exited without reopening the gate; the process is on its way down anyway.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(gate.is_closed());
    }
}
