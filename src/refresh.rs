/*
 *  refresh.rs
 *
 *  DataBot - atmospheric data on a Pimoroni ScrollBot
 *	(c) 2020-26 Stuart Hunter
 *
 *	TODO:
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use std::future::Future;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::fetch::FetchOutcome;

/// Recurring background fetch task, one per data kind.
///
/// The delay is armed after each run of the fetch completes, so the effective
/// period is interval + fetch latency and runs of the same task never
/// overlap. The two kinds run on independent `Refresher`s and are free to
/// overlap each other.
pub struct Refresher {
    name: &'static str,
    interval_tx: watch::Sender<Duration>,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Refresher {
    /// Start the recurring task. The first fetch runs immediately so the
    /// display is not blank for a whole interval after startup; every later
    /// fetch waits `interval` measured from the previous completion.
    ///
    /// `fetch` returns an outcome rather than a result: a failed fetch is the
    /// fetcher's problem, the cadence here never stops because of one.
    pub fn spawn<F, Fut>(name: &'static str, interval: Duration, mut fetch: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        let (interval_tx, interval_rx) = watch::channel(interval);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            loop {
                match fetch().await {
                    FetchOutcome::Updated => debug!("{name}: refresh complete"),
                    FetchOutcome::Failed => warn!("{name}: refresh failed, cadence unchanged"),
                }

                // Re-arm from completion. Reading the interval here is what
                // makes set_interval take effect at the next arming only.
                let delay = *interval_rx.borrow();
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = stop_rx.recv() => {
                        info!("{name}: refresh task received stop signal, exiting");
                        break;
                    }
                }
            }
        });

        Refresher {
            name,
            interval_tx,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Change the delay used for the next arming. A currently pending timer
    /// is left to fire on the old schedule.
    #[allow(dead_code)]
    pub fn set_interval(&self, interval: Duration) {
        let _ = self.interval_tx.send(interval);
    }

    /// Cancel future firings and wait for the task to wind down. An in-flight
    /// fetch is not interrupted.
    pub async fn stop(&mut self) {
        if let Some(sender) = self.stop_tx.take() {
            if let Err(e) = sender.send(()).await {
                error!("{}: failed to send stop signal: {e}", self.name);
            }
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .unwrap_or_else(|e| error!("{}: refresh task failed to join: {e}", self.name));
        }
        info!("{}: refresh stopped", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        count: Arc<AtomicUsize>,
        outcome: FetchOutcome,
    ) -> impl FnMut() -> std::future::Ready<FetchOutcome> + Send + 'static {
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(outcome)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_fetch_runs_immediately() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut task = Refresher::spawn(
            "test",
            Duration::from_secs(600),
            counting_fetch(count.clone(), FetchOutcome::Updated),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rearms_after_every_failure() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut task = Refresher::spawn(
            "test",
            Duration::from_secs(5),
            counting_fetch(count.clone(), FetchOutcome::Failed),
        );

        // N consecutive failures must still produce attempt N+1
        tokio::time::sleep(Duration::from_secs(26)).await;
        assert!(count.load(Ordering::SeqCst) >= 6);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_future_firings() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut task = Refresher::spawn(
            "test",
            Duration::from_secs(5),
            counting_fetch(count.clone(), FetchOutcome::Updated),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        task.stop().await;
        let at_stop = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn set_interval_applies_at_next_arming() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut task = Refresher::spawn(
            "test",
            Duration::from_secs(1000),
            counting_fetch(count.clone(), FetchOutcome::Updated),
        );
        // sent before the first arming, so the long interval is never used
        task.set_interval(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(count.load(Ordering::SeqCst) >= 3);
        task.stop().await;
    }
}
