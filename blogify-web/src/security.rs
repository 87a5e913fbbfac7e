//! Admission control for the Blogify API
//!
//! A per-client sliding-window request log. Each client key owns a queue of
//! admission timestamps; entries at or before `now - window` are discarded on
//! every touch and by a periodic compaction sweep.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use blogify_applications::AccessError;
use blogify_core::AdmissionConfig;
use dashmap::DashMap;
use std::{
    collections::VecDeque,
    fmt,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};
use tokio::{sync::oneshot, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

use crate::{error::ApiError, AppState};

/// Shortest compaction period; `tokio::time::interval` rejects zero
pub const MIN_COMPACTION_INTERVAL: Duration = Duration::from_millis(1);

/// Rate-limit bucket identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a single admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: usize },
    Rejected { retry_after_ms: u64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// What one compaction sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
    pub keys_scanned: usize,
    pub keys_removed: usize,
    pub entries_dropped: usize,
}

/// Sliding-window admission controller.
///
/// The map is sharded; `admit` and `compact` both mutate a key's log only
/// while holding that key's shard write lock.
pub struct AdmissionController {
    window_ms: u64,
    max_requests: usize,
    trust_forwarded_for: bool,
    logs: DashMap<ClientKey, VecDeque<u64>>,
    epoch: Instant,
}

impl AdmissionController {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            window_ms: config.window_ms,
            max_requests: config.max_requests,
            trust_forwarded_for: config.trust_forwarded_for,
            logs: DashMap::new(),
            epoch: Instant::now(),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Milliseconds on the controller's monotonic clock
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn cutoff(&self, now_ms: u64) -> Option<u64> {
        now_ms.checked_sub(self.window_ms)
    }

    /// Admit or reject a request from `key` at `now_ms`.
    ///
    /// A rejected request is not recorded.
    pub fn admit(&self, key: &ClientKey, now_ms: u64) -> Admission {
        let cutoff = self.cutoff(now_ms);
        let mut log = self.logs.entry(key.clone()).or_default();
        prune(&mut log, cutoff);

        if log.len() >= self.max_requests {
            let oldest = log.front().copied().unwrap_or(now_ms);
            let retry_after_ms = oldest
                .saturating_add(self.window_ms)
                .saturating_sub(now_ms)
                .max(1);
            return Admission::Rejected { retry_after_ms };
        }

        log.push_back(now_ms);
        Admission::Allowed {
            remaining: self.max_requests - log.len(),
        }
    }

    /// Drop stale entries everywhere and forget clients with nothing left
    pub fn compact(&self, now_ms: u64) -> CompactionStats {
        let cutoff = self.cutoff(now_ms);
        let mut stats = CompactionStats::default();

        self.logs.retain(|_, log| {
            stats.keys_scanned += 1;
            stats.entries_dropped += prune(log, cutoff);
            let keep = !log.is_empty();
            if !keep {
                stats.keys_removed += 1;
            }
            keep
        });

        stats
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.logs.len()
    }

    /// Admissions recorded for `key` inside the current window
    pub fn recorded(&self, key: &ClientKey) -> usize {
        self.logs.get(key).map(|log| log.len()).unwrap_or(0)
    }

    /// Derive the bucket key for a request
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientKey {
        if self.trust_forwarded_for {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return ClientKey::new(ip);
            }
        }

        match peer {
            Some(addr) => ClientKey::new(addr.ip().to_string()),
            None => ClientKey::unknown(),
        }
    }

    /// Start the periodic compaction sweep. A zero interval is raised to
    /// [`MIN_COMPACTION_INTERVAL`].
    pub fn spawn_compaction(self: &Arc<Self>, interval: Duration) -> CompactionHandle {
        if interval.is_zero() {
            warn!("Zero compaction interval, using {:?}", MIN_COMPACTION_INTERVAL);
        }
        let interval = interval.max(MIN_COMPACTION_INTERVAL);
        let controller = Arc::clone(self);
        let (shutdown, mut stop) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    _ = ticker.tick() => {
                        let stats = controller.compact(controller.now_ms());
                        debug!(
                            keys_scanned = stats.keys_scanned,
                            keys_removed = stats.keys_removed,
                            entries_dropped = stats.entries_dropped,
                            "Admission log compaction completed"
                        );
                    }
                }
            }

            info!("Admission compaction stopped");
        });

        info!(interval_ms = interval.as_millis() as u64, "Admission compaction started");
        CompactionHandle { shutdown, task }
    }
}

/// Remove entries at or before `cutoff`, returning how many were dropped
fn prune(log: &mut VecDeque<u64>, cutoff: Option<u64>) -> usize {
    let Some(cutoff) = cutoff else {
        return 0;
    };
    let mut dropped = 0;
    while log.front().is_some_and(|&ts| ts <= cutoff) {
        log.pop_front();
        dropped += 1;
    }
    dropped
}

/// Owner of the background compaction task
pub struct CompactionHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CompactionHandle {
    /// Stop the sweep and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!("Admission compaction task ended abnormally: {}", e);
        }
    }
}

/// Admission middleware, applied ahead of identity resolution
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let admission = &state.admission;
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = admission.client_key(request.headers(), peer);

    match admission.admit(&key, admission.now_ms()) {
        Admission::Allowed { remaining } => {
            debug!(client = %key, remaining, "Request admitted");
            next.run(request).await
        }
        Admission::Rejected { retry_after_ms } => {
            warn!(client = %key, retry_after_ms, "Rate limit exceeded");
            let mut response =
                ApiError::from(AccessError::AdmissionRejected { retry_after_ms }).into_response();
            let seconds = retry_after_ms.div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(max_requests: usize, window_ms: u64) -> AdmissionController {
        AdmissionController::new(&AdmissionConfig {
            window_ms,
            max_requests,
            compaction_interval_ms: 1000,
            trust_forwarded_for: false,
        })
    }

    #[test]
    fn threshold_three_scenario() {
        let c = controller(3, 1000);
        let key = ClientKey::new("10.0.0.1");

        assert!(c.admit(&key, 0).is_allowed());
        assert!(c.admit(&key, 100).is_allowed());
        assert!(c.admit(&key, 200).is_allowed());
        assert_eq!(
            c.admit(&key, 300),
            Admission::Rejected { retry_after_ms: 700 }
        );
        // Rejection left the log alone
        assert_eq!(c.recorded(&key), 3);
        assert!(c.admit(&key, 1100).is_allowed());
    }

    #[test]
    fn never_exceeds_threshold_in_any_window() {
        let c = controller(5, 1000);
        let key = ClientKey::new("k");
        let mut admitted = Vec::new();

        let mut t = 0;
        while t < 10_000 {
            if c.admit(&key, t).is_allowed() {
                admitted.push(t);
            }
            t += 37;
        }

        for (i, &start) in admitted.iter().enumerate() {
            let in_window = admitted[i..].iter().take_while(|&&ts| ts < start + 1000).count();
            assert!(in_window <= 5, "window starting at {} held {}", start, in_window);
        }
        assert!(admitted.len() > 5);
    }

    #[test]
    fn keys_are_independent() {
        let c = controller(1, 1000);
        assert!(c.admit(&ClientKey::new("a"), 0).is_allowed());
        assert!(!c.admit(&ClientKey::new("a"), 1).is_allowed());
        assert!(c.admit(&ClientKey::new("b"), 1).is_allowed());
    }

    #[test]
    fn compaction_drops_stale_entries_and_empty_keys() {
        let c = controller(10, 1000);
        let old = ClientKey::new("old");
        let busy = ClientKey::new("busy");

        c.admit(&old, 0);
        c.admit(&old, 100);
        c.admit(&busy, 100);
        c.admit(&busy, 1500);

        let stats = c.compact(1600);
        assert_eq!(
            stats,
            CompactionStats {
                keys_scanned: 2,
                keys_removed: 1,
                entries_dropped: 3,
            }
        );
        assert_eq!(c.tracked_clients(), 1);
        assert_eq!(c.recorded(&busy), 1);
        assert_eq!(c.recorded(&old), 0);
    }

    #[test]
    fn compaction_before_first_window_keeps_everything() {
        let c = controller(10, 1000);
        c.admit(&ClientKey::new("a"), 0);
        assert_eq!(c.compact(500).entries_dropped, 0);
        assert_eq!(c.tracked_clients(), 1);
    }

    #[test]
    fn forwarded_header_is_ignored_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();

        let untrusted = controller(1, 1000);
        assert_eq!(untrusted.client_key(&headers, Some(peer)).as_str(), "192.0.2.1");
        assert_eq!(untrusted.client_key(&headers, None), ClientKey::unknown());

        let trusted = AdmissionController::new(&AdmissionConfig {
            trust_forwarded_for: true,
            ..AdmissionConfig::default()
        });
        assert_eq!(trusted.client_key(&headers, Some(peer)).as_str(), "203.0.113.9");
    }

    #[tokio::test]
    async fn concurrent_admits_respect_the_threshold() {
        let c = Arc::new(controller(50, 60_000));
        let key = ClientKey::new("shared");

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let c = Arc::clone(&c);
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                (0..20).filter(|_| c.admit(&key, 10).is_allowed()).count()
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            admitted += task.await.unwrap();
        }
        assert_eq!(admitted, 50);
        assert_eq!(c.recorded(&key), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn compaction_task_sweeps_and_stops() {
        let c = Arc::new(controller(10, 10));
        c.admit(&ClientKey::new("a"), c.now_ms());
        assert_eq!(c.tracked_clients(), 1);

        let handle = c.spawn_compaction(Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(c.tracked_clients(), 0);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_compaction_interval_still_sweeps() {
        let c = Arc::new(controller(10, 10));
        c.admit(&ClientKey::new("a"), c.now_ms());

        let handle = c.spawn_compaction(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(c.tracked_clients(), 0);
        handle.shutdown().await;
    }
}
