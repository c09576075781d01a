//! Actor reminders app
//!
//! Registers a reminder on each of `num_actors` actors, counts the reminder
//! and timer callbacks the sidecar delivers, and logs a histogram of the
//! counts every second.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use futures::future::join_all;
use parking_lot::Mutex;
use testapps_sidecar::{ActorRuntimeConfig, ReminderRequest, SidecarClient, TimerRequest};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::http;

pub const ACTOR_TYPE: &str = "testActorType";
pub const DEFAULT_NUM_ACTORS: usize = 1000;

/// Due time and period of every reminder and timer
const SCHEDULE: &str = "1s";

/// Actor method the timers call back
const TIMER_CALLBACK: &str = "timerMethod";

pub fn actor_id(i: usize) -> String {
    format!("my-actor-id-{i}")
}

pub fn reminder_name(i: usize) -> String {
    format!("my-reminder-{i}")
}

pub fn timer_name(i: usize) -> String {
    format!("my-timer-{i}")
}

// =============================================================================
// Call counts
// =============================================================================

/// Number of callbacks received per actor id
#[derive(Debug, Default)]
pub struct ActorCallCounts {
    calls: Mutex<HashMap<String, u64>>,
}

impl ActorCallCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, actor_id: &str) {
        *self.calls.lock().entry(actor_id.to_string()).or_insert(0) += 1;
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.calls.lock().clone()
    }

    /// Call count -> number of actors with that count
    ///
    /// Covers `my-actor-id-0` up to `num_actors - 1`; actors never called
    /// count as 0.
    pub fn histogram(&self, num_actors: usize) -> BTreeMap<u64, usize> {
        let calls = self.calls.lock();
        let mut histogram = BTreeMap::new();
        for i in 0..num_actors {
            let count = calls.get(&actor_id(i)).copied().unwrap_or(0);
            *histogram.entry(count).or_insert(0) += 1;
        }
        histogram
    }
}

/// Log the histogram every `interval` until `shutdown` is cancelled
pub async fn report_stats(
    counts: Arc<ActorCallCounts>,
    num_actors: usize,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Stats reporter stopped");
                return;
            }
            _ = ticker.tick() => {
                let histogram = counts.histogram(num_actors);
                info!(stats = ?histogram, "Summarized stats");
            }
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

#[derive(Clone)]
pub struct ActorsState {
    pub sidecar: SidecarClient,
    pub counts: Arc<ActorCallCounts>,
    pub num_actors: usize,
}

impl ActorsState {
    pub fn new(sidecar: SidecarClient, counts: Arc<ActorCallCounts>) -> Self {
        Self {
            sidecar,
            counts,
            num_actors: DEFAULT_NUM_ACTORS,
        }
    }

    pub fn with_num_actors(mut self, num_actors: usize) -> Self {
        self.num_actors = num_actors;
        self
    }
}

/// Count the failures of a fan-out, logging each one
fn log_failures<E: std::fmt::Display>(
    results: Vec<Result<(), E>>,
    operation: &'static str,
) -> usize {
    let mut failures = 0;
    for (i, result) in results.into_iter().enumerate() {
        if let Err(e) = result {
            failures += 1;
            error!(actor_id = %actor_id(i), error = %e, "Error {operation}");
        }
    }
    failures
}

async fn register_reminders(State(state): State<ActorsState>) -> &'static str {
    let reminder = ReminderRequest::new(SCHEDULE, SCHEDULE);
    let results = join_all((0..state.num_actors).map(|i| {
        let sidecar = &state.sidecar;
        let reminder = &reminder;
        async move {
            sidecar
                .register_actor_reminder(ACTOR_TYPE, &actor_id(i), &reminder_name(i), reminder)
                .await
        }
    }))
    .await;

    let failures = log_failures(results, "registering reminder");
    info!(actors = state.num_actors, failures, "Reminders registered");
    "Reminders registered"
}

async fn unregister_reminders(State(state): State<ActorsState>) -> &'static str {
    let results = join_all((0..state.num_actors).map(|i| {
        let sidecar = &state.sidecar;
        async move {
            sidecar
                .unregister_actor_reminder(ACTOR_TYPE, &actor_id(i), &reminder_name(i))
                .await
        }
    }))
    .await;

    let failures = log_failures(results, "unregistering reminder");
    info!(actors = state.num_actors, failures, "Reminders unregistered");
    "Reminders unregistered"
}

async fn register_timers(State(state): State<ActorsState>) -> &'static str {
    let timer = TimerRequest::new(SCHEDULE, SCHEDULE, TIMER_CALLBACK);
    let results = join_all((0..state.num_actors).map(|i| {
        let sidecar = &state.sidecar;
        let timer = &timer;
        async move {
            sidecar
                .register_actor_timer(ACTOR_TYPE, &actor_id(i), &timer_name(i), timer)
                .await
        }
    }))
    .await;

    let failures = log_failures(results, "registering timer");
    info!(actors = state.num_actors, failures, "Timers registered");
    "Timers registered"
}

async fn unregister_timers(State(state): State<ActorsState>) -> &'static str {
    let results = join_all((0..state.num_actors).map(|i| {
        let sidecar = &state.sidecar;
        async move {
            sidecar
                .unregister_actor_timer(ACTOR_TYPE, &actor_id(i), &timer_name(i))
                .await
        }
    }))
    .await;

    let failures = log_failures(results, "unregistering timer");
    info!(actors = state.num_actors, failures, "Timers unregistered");
    "Timers unregistered"
}

async fn clear_stats(State(state): State<ActorsState>) -> &'static str {
    state.counts.clear();
    "Stats cleared"
}

async fn shutdown_sidecar(State(state): State<ActorsState>) -> impl IntoResponse {
    match state.sidecar.shutdown().await {
        Ok(()) => (StatusCode::OK, "Sidecar shutdown"),
        Err(e) => {
            error!(error = %e, "Could not shutdown sidecar");
            (StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}

async fn actor_config() -> Json<ActorRuntimeConfig> {
    let config = ActorRuntimeConfig::new([ACTOR_TYPE]);
    info!(entities = ?config.entities, "Processing actor config request");
    Json(config)
}

/// Path of an actor method invocation
#[derive(Debug, serde::Deserialize)]
struct ActorMethodPath {
    actor_type: String,
    id: String,
    kind: String,
    method: String,
}

async fn actor_method(
    State(state): State<ActorsState>,
    Path(path): Path<ActorMethodPath>,
) -> &'static str {
    tracing::debug!(
        actor_type = %path.actor_type,
        actor_id = %path.id,
        kind = %path.kind,
        method = %path.method,
        "Actor method called"
    );
    state.counts.record(&path.id);
    "Actor method called"
}

pub fn routes(state: ActorsState) -> Router {
    Router::new()
        .route("/dapr/config", get(actor_config))
        .route("/register-reminder", post(register_reminders))
        .route("/unregister-reminder", post(unregister_reminders))
        .route("/register-timer", post(register_timers))
        .route("/unregister-timer", post(unregister_timers))
        .route("/clear-stats", post(clear_stats))
        .route("/shutdown", post(shutdown_sidecar))
        .route(
            "/actors/:actor_type/:id/method/:kind/:method",
            put(actor_method),
        )
        .with_state(state)
}

/// Complete router of the actors app
pub fn app(state: ActorsState) -> Router {
    Router::new()
        .merge(http::health_routes())
        .merge(routes(state))
        .fallback(http::not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let counts = ActorCallCounts::new();
        counts.record("my-actor-id-1");
        counts.record("my-actor-id-1");
        counts.record("other");

        let snapshot = counts.snapshot();
        assert_eq!(snapshot.get("my-actor-id-1"), Some(&2));
        assert_eq!(snapshot.get("other"), Some(&1));

        counts.clear();
        assert!(counts.snapshot().is_empty());
    }

    #[test]
    fn test_histogram_counts_missing_actors_as_zero() {
        let counts = ActorCallCounts::new();
        counts.record(&actor_id(0));
        counts.record(&actor_id(0));
        counts.record(&actor_id(1));
        // Outside the tracked range
        counts.record(&actor_id(10));

        let histogram = counts.histogram(4);
        assert_eq!(histogram, BTreeMap::from([(0, 2), (1, 1), (2, 1)]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_stats_stops_on_cancel() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(report_stats(
            Arc::new(ActorCallCounts::new()),
            10,
            Duration::from_secs(1),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        token.cancel();
        handle.await.unwrap();
    }
}
