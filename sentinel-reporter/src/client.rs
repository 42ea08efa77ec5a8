//! The Reporter itself (§4.7): queued batch delivery, a critical-event
//! bypass path, and registration/heartbeat/shutdown lifecycle.
//!
//! The ticker runs as a spawned task guarded by a `tokio::sync::oneshot`
//! shutdown channel, selected against in a loop, joined on stop rather
//! than aborted outright.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use sentinel_types::{Bot, Event};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::config::ReporterConfig;
use crate::error::ReporterError;
use crate::queue::Queue;

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CRITICAL_RETRY_DELAYS: [Duration; 3] =
    [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(3)];

/// Registration payload (§4.8 `POST /api/bots/register` body, as sent by
/// the agent side).
#[derive(Debug, Clone, serde::Serialize)]
pub struct RegisterRequest {
    pub bot_id: String,
    pub persona_category: String,
    pub persona_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub config_hash: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Heartbeat payload (§4.7: `{status, active_sessions, memory_usage,
/// version}`).
#[derive(Debug, Clone, serde::Serialize)]
struct HeartbeatPayload {
    status: &'static str,
    active_sessions: u64,
    memory_usage: u64,
    version: &'static str,
}

struct Tickers {
    flush_shutdown: oneshot::Sender<()>,
    flush_handle: JoinHandle<()>,
    heartbeat_shutdown: oneshot::Sender<()>,
    heartbeat_handle: JoinHandle<()>,
}

/// Per-agent telemetry client. Cheap to clone (everything shared is behind
/// an `Arc`); clones all observe the same queue and registration state.
#[derive(Clone)]
pub struct Reporter {
    inner: Arc<Inner>,
}

struct Inner {
    config: ReporterConfig,
    http: reqwest::Client,
    queue: AsyncMutex<Queue>,
    active_sessions: AtomicU64,
    tickers: SyncMutex<Option<Tickers>>,
}

impl Reporter {
    #[must_use]
    pub fn new(config: ReporterConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                http: reqwest::Client::new(),
                queue: AsyncMutex::new(Queue::new()),
                active_sessions: AtomicU64::new(0),
                tickers: SyncMutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.config.is_enabled()
    }

    /// Lets a caller report how many sessions are currently active, for
    /// the heartbeat payload. A no-op when the reporter is disabled.
    pub fn set_active_sessions(&self, count: u64) {
        self.inner.active_sessions.store(count, Ordering::Relaxed);
    }

    fn headers(&self) -> Result<reqwest::header::HeaderMap, ReporterError> {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(bot_id) = &self.inner.config.bot_id {
            headers.insert(
                HeaderName::from_static("x-bot-id"),
                HeaderValue::from_str(bot_id).map_err(|_| ReporterError::NonSuccessStatus {
                    status: reqwest::StatusCode::BAD_REQUEST,
                })?,
            );
        }
        if let Some(secret) = &self.inner.config.bot_secret {
            headers.insert(
                HeaderName::from_static("x-bot-secret"),
                HeaderValue::from_str(secret).map_err(|_| ReporterError::NonSuccessStatus {
                    status: reqwest::StatusCode::BAD_REQUEST,
                })?,
            );
        }
        Ok(headers)
    }

    fn endpoint(&self, path: &str) -> Option<String> {
        self.inner.config.central_url.as_deref().map(|base| format!("{}{}", base.trim_end_matches('/'), path))
    }

    /// Registers this agent's persona at startup. No-op when disabled.
    pub async fn register(&self, persona: RegisterRequest) -> Result<(), ReporterError> {
        if !self.is_enabled() {
            return Ok(());
        }
        let Some(url) = self.endpoint("/api/bots/register") else {
            return Ok(());
        };
        self.post_json(&url, &persona).await.map(|_| ())
    }

    /// Starts the flush and heartbeat tickers. Calling this more than once
    /// without an intervening `shutdown()` is a no-op.
    pub fn start(&self) {
        if !self.is_enabled() {
            return;
        }
        let mut tickers = self.inner.tickers.lock();
        if tickers.is_some() {
            return;
        }

        let (flush_shutdown, mut flush_rx) = oneshot::channel();
        let flush_reporter = self.clone();
        let flush_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);
            loop {
                tokio::select! {
                    _ = &mut flush_rx => break,
                    _ = interval.tick() => {
                        flush_reporter.flush().await;
                    }
                }
            }
        });

        let (heartbeat_shutdown, mut heartbeat_rx) = oneshot::channel();
        let heartbeat_reporter = self.clone();
        let heartbeat_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                tokio::select! {
                    _ = &mut heartbeat_rx => break,
                    _ = interval.tick() => {
                        heartbeat_reporter.send_heartbeat("online").await;
                    }
                }
            }
        });

        *tickers = Some(Tickers {
            flush_shutdown,
            flush_handle,
            heartbeat_shutdown,
            heartbeat_handle,
        });
    }

    /// Appends to the queue; if that fills it, flushes immediately
    /// (§4.7: "if full, immediately triggers flush"). No-op when disabled.
    pub async fn report_event(&self, event: Event) {
        if !self.is_enabled() {
            return;
        }
        let should_flush = {
            let mut queue = self.inner.queue.lock().await;
            queue.push(event, Utc::now());
            queue.is_full()
        };
        if should_flush {
            self.flush().await;
        }
    }

    /// Drains up to 100 queued events and POSTs them as one batch. Failed
    /// batches are requeued at the head, preserving order.
    pub async fn flush(&self) {
        if !self.is_enabled() {
            return;
        }
        let Some(url) = self.endpoint("/api/events/batch") else {
            return;
        };
        let batch = {
            let mut queue = self.inner.queue.lock().await;
            queue.drain_batch(crate::queue::QUEUE_CAPACITY)
        };
        if batch.is_empty() {
            return;
        }
        let events: Vec<&Event> = batch.iter().map(|q| &q.event).collect();
        match self.post_json(&url, &events).await {
            Ok(()) => {}
            Err(err) => {
                tracing::warn!(target: "sentinel_reporter::client", error = %err, count = batch.len(), "batch flush failed; requeuing");
                let mut queue = self.inner.queue.lock().await;
                queue.requeue_front(batch);
            }
        }
    }

    /// Bypasses the queue entirely with a 3-attempt retry schedule
    /// (1s, 2s, 3s). On total failure the event is pushed to the head of
    /// the queue for the next periodic flush to pick up.
    pub async fn report_critical_event(&self, event: Event) {
        if !self.is_enabled() {
            return;
        }
        let Some(url) = self.endpoint("/api/events") else {
            return;
        };
        for delay in CRITICAL_RETRY_DELAYS {
            match self.post_json(&url, &event).await {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!(target: "sentinel_reporter::client", error = %err, "critical event post failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
        tracing::error!(target: "sentinel_reporter::client", "critical event delivery exhausted retries; requeuing");
        let mut queue = self.inner.queue.lock().await;
        queue.push_front(event, Utc::now());
    }

    async fn send_heartbeat(&self, status: &'static str) {
        let Some(url) = self.endpoint(&format!("/api/bots/{}/heartbeat", self.bot_id_or_empty())) else {
            return;
        };
        let payload = HeartbeatPayload {
            status,
            active_sessions: self.inner.active_sessions.load(Ordering::Relaxed),
            memory_usage: current_memory_usage_bytes(),
            version: env!("CARGO_PKG_VERSION"),
        };
        if let Err(err) = self.post_json(&url, &payload).await {
            tracing::warn!(target: "sentinel_reporter::client", error = %err, "heartbeat failed");
        }
    }

    fn bot_id_or_empty(&self) -> &str {
        self.inner.config.bot_id.as_deref().unwrap_or_default()
    }

    async fn post_json<T: serde::Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), ReporterError> {
        let response = self.inner.http.post(url).headers(self.headers()?).json(body).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ReporterError::NonSuccessStatus {
                status: response.status(),
            })
        }
    }

    /// Stops the tickers, flushes whatever remains in the queue, and sends
    /// a final `status: "offline"` heartbeat (§4.7).
    pub async fn shutdown(&self) {
        let tickers = self.inner.tickers.lock().take();
        if let Some(tickers) = tickers {
            let _ = tickers.flush_shutdown.send(());
            let _ = tickers.flush_handle.await;
            let _ = tickers.heartbeat_shutdown.send(());
            let _ = tickers.heartbeat_handle.await;
        }
        self.flush().await;
        if self.is_enabled() {
            self.send_heartbeat("offline").await;
        }
    }
}

impl RegisterRequest {
    #[must_use]
    pub fn from_bot(bot: &Bot) -> Self {
        Self {
            bot_id: bot.bot_id.clone(),
            persona_category: bot.persona_category.clone(),
            persona_name: bot.persona_name.clone(),
            company_name: bot.company_name.clone(),
            config_hash: bot.config_hash.clone(),
            metadata: bot.metadata.clone(),
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn current_memory_usage_bytes() -> u64 {
    0
}

#[cfg(target_os = "linux")]
fn current_memory_usage_bytes() -> u64 {
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|s| s.split_whitespace().nth(1).map(str::to_string))
        .and_then(|pages| pages.parse::<u64>().ok())
        .map(|pages| pages * 4096)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> ReporterConfig {
        ReporterConfig {
            central_url: None,
            bot_id: None,
            bot_secret: None,
            persona_file: None,
        }
    }

    fn enabled_config(url: String) -> ReporterConfig {
        ReporterConfig {
            central_url: Some(url),
            bot_id: Some("bot-1".to_string()),
            bot_secret: Some("s3cr3t".to_string()),
            persona_file: None,
        }
    }

    #[tokio::test]
    async fn disabled_reporter_no_ops_every_operation() {
        let reporter = Reporter::new(disabled_config());
        reporter.report_event(Event::new("bot-1")).await;
        reporter.report_critical_event(Event::new("bot-1")).await;
        reporter.flush().await;
        reporter.shutdown().await;
        // No panics, no network calls attempted - nothing further to assert
        // without a mock server, which disabled mode never reaches.
    }

    #[tokio::test]
    async fn report_event_queues_without_flushing_below_capacity() {
        let reporter = Reporter::new(enabled_config("http://127.0.0.1:9".to_string()));
        reporter.report_event(Event::new("bot-1")).await;
        let queue = reporter.inner.queue.lock().await;
        assert_eq!(queue.len(), 1);
    }
}
