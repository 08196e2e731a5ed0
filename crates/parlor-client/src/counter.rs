//! Out-of-band poll of the server's aggregate chatter count.
//!
//! Independent of any session's phase: the poller runs on a fixed interval
//! against a plain HTTP endpoint and publishes the latest value on a watch
//! channel. Poll failures are logged and ignored — they are never surfaced
//! as session errors.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;

/// Wire shape of the counter endpoint: `{"count": N}`.
#[derive(Debug, Deserialize)]
struct CountDocument {
    count: u64,
}

/// Background poller for the aggregate chatter count.
pub struct ChatterCountPoller {
    latest: watch::Receiver<Option<u64>>,
    abort_handle: tokio::task::AbortHandle,
}

impl ChatterCountPoller {
    /// Start polling `endpoint` (e.g. `http://localhost:9002/chatters`) every
    /// `interval`.
    pub fn spawn(endpoint: impl Into<String>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(poll_loop(endpoint.into(), interval, tx));
        Self { latest: rx, abort_handle: handle.abort_handle() }
    }

    /// Most recent successfully polled count. `None` until the first success.
    pub fn latest(&self) -> Option<u64> {
        *self.latest.borrow()
    }

    /// Subscribe to count updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.latest.clone()
    }

    /// Stop polling.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ChatterCountPoller {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

async fn poll_loop(endpoint: String, interval: Duration, tx: watch::Sender<Option<u64>>) {
    let client = reqwest::Client::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match fetch_count(&client, &endpoint).await {
            Ok(count) => {
                if tx.send(Some(count)).is_err() {
                    return;
                }
            },
            Err(err) => tracing::debug!("chatter count poll failed: {err}"),
        }
    }
}

async fn fetch_count(client: &reqwest::Client, endpoint: &str) -> Result<u64, reqwest::Error> {
    let document: CountDocument =
        client.get(endpoint).send().await?.error_for_status()?.json().await?;
    Ok(document.count)
}
