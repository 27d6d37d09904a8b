use std::{sync::Arc, time::Duration};

use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use shared::domain::{Intent, RecommendationItem, SearchResultItem, UserId, UserStats};

pub mod api;
pub mod state;

pub use api::{HttpRecommenderApi, RecommenderApi};
pub use state::{ProfileState, SearchState, TrainingState};

/// How long the cosmetic training busy indicator stays on. It signals
/// "training was recently triggered", not "training is still running"; the
/// backend job usually outlives it.
pub const DEFAULT_TRAINING_INDICATOR: Duration = Duration::from_secs(8);

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notifications emitted by the orchestrator as flow state changes. The
/// renderer mirrors these into its view state; it never feeds data back.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    RecommendationsLoaded(Vec<RecommendationItem>),
    StatsLoaded(UserStats),
    SearchStarted {
        query: String,
    },
    SearchCompleted {
        results: Vec<SearchResultItem>,
        intent: Intent,
    },
    /// The pending flag has already been released when this is emitted;
    /// previous results and intent are left untouched.
    SearchFailed {
        message: String,
    },
    TrainingStarted,
    /// The request never reached the backend. The busy indicator still
    /// clears on its own schedule.
    TrainingFailed {
        message: String,
    },
    TrainingIdle,
}

/// Result of a search submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Accepted,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Whitespace-only input aborts with no state change and no network call.
    EmptyQuery,
    /// A search is already in flight; overlapping submissions are rejected,
    /// not queued.
    SearchPending,
}

/// Read-only view of the combined flow state, for renderers that poll
/// instead of subscribing.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub profile: ProfileState,
    pub search: SearchState,
    pub training: TrainingState,
}

#[derive(Default)]
struct DashboardState {
    profile: ProfileState,
    search: SearchState,
    training: TrainingState,
    profile_loaded_once: bool,
    profile_generation: u64,
    search_generation: u64,
}

/// Client-side orchestrator for the three dashboard flows: the one-shot
/// profile load, the search cycle, and the training trigger. All state is
/// session-local; the flows own disjoint fields and never block each other.
pub struct DashboardClient {
    api: Arc<dyn RecommenderApi>,
    user_id: UserId,
    training_indicator: Duration,
    inner: Mutex<DashboardState>,
    events: broadcast::Sender<ClientEvent>,
}

impl DashboardClient {
    pub fn new(server_url: impl Into<String>, user_id: UserId) -> Arc<Self> {
        Self::new_with_dependencies(
            Arc::new(HttpRecommenderApi::new(server_url)),
            user_id,
            DEFAULT_TRAINING_INDICATOR,
        )
    }

    pub fn new_with_dependencies(
        api: Arc<dyn RecommenderApi>,
        user_id: UserId,
        training_indicator: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            user_id,
            training_indicator,
            inner: Mutex::new(DashboardState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let inner = self.inner.lock().await;
        DashboardSnapshot {
            profile: inner.profile.clone(),
            search: inner.search.clone(),
            training: inner.training.clone(),
        }
    }

    /// One-shot startup load of recommendations and stats. Returns false if
    /// the session has already loaded the profile (re-mounts must not
    /// re-run it).
    pub async fn load_profile(&self) -> bool {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.profile_loaded_once {
                info!("profile already loaded this session; skipping");
                return false;
            }
            inner.profile_loaded_once = true;
            inner.profile_generation += 1;
            inner.profile_generation
        };
        self.fetch_profile(generation).await;
        true
    }

    /// Explicit refresh. Bumps the profile generation so responses still in
    /// flight from an earlier load are dropped instead of applied out of
    /// order.
    pub async fn reload_profile(&self) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.profile_loaded_once = true;
            inner.profile_generation += 1;
            inner.profile_generation
        };
        self.fetch_profile(generation).await;
    }

    /// Both reads are in flight simultaneously and each leg publishes as
    /// soon as its own request settles; a slow stats response never holds
    /// back recommendations. A failed leg is logged and leaves its initial
    /// empty value in place.
    async fn fetch_profile(&self, generation: u64) {
        let recommendations = async {
            match self.api.fetch_recommendations(&self.user_id).await {
                Ok(items) => {
                    let mut inner = self.inner.lock().await;
                    if inner.profile_generation != generation {
                        info!("dropping stale recommendations response");
                        return;
                    }
                    info!(count = items.len(), "recommendations loaded");
                    inner.profile.publish_recommendations(items.clone());
                    drop(inner);
                    let _ = self.events.send(ClientEvent::RecommendationsLoaded(items));
                }
                Err(err) => warn!(
                    user_id = %self.user_id,
                    error = %err,
                    "failed to fetch recommendations; keeping empty list"
                ),
            }
        };

        let stats = async {
            match self.api.fetch_stats(&self.user_id).await {
                Ok(stats) => {
                    let mut inner = self.inner.lock().await;
                    if inner.profile_generation != generation {
                        info!("dropping stale stats response");
                        return;
                    }
                    if stats.llm_profile.is_none() {
                        info!("stats loaded without llm profile; enrichment still pending");
                    }
                    inner.profile.publish_stats(stats.clone());
                    drop(inner);
                    let _ = self.events.send(ClientEvent::StatsLoaded(stats));
                }
                Err(err) => warn!(
                    user_id = %self.user_id,
                    error = %err,
                    "failed to fetch user stats; leaving stats unset"
                ),
            }
        };

        futures::future::join(recommendations, stats).await;
    }

    /// Submits a free-text query. Empty input and overlapping submissions
    /// are rejected without touching state or the network.
    pub async fn submit_search(&self, query: &str) -> SearchOutcome {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return SearchOutcome::Rejected(RejectReason::EmptyQuery);
        }

        let generation = {
            let mut inner = self.inner.lock().await;
            if !inner.search.begin() {
                return SearchOutcome::Rejected(RejectReason::SearchPending);
            }
            inner.search_generation += 1;
            inner.search_generation
        };
        let _ = self.events.send(ClientEvent::SearchStarted {
            query: trimmed.to_string(),
        });

        let outcome = self.api.search(trimmed).await;

        // The pending flag releases on every exit path, before the outcome
        // is interpreted.
        let mut inner = self.inner.lock().await;
        inner.search.settle();
        match outcome {
            Ok(response) if inner.search_generation == generation => {
                inner
                    .search
                    .publish(response.results.clone(), response.intent.clone());
                drop(inner);
                let _ = self.events.send(ClientEvent::SearchCompleted {
                    results: response.results,
                    intent: response.intent,
                });
            }
            Ok(_) => {
                drop(inner);
                info!("dropping superseded search response");
                let _ = self.events.send(ClientEvent::SearchFailed {
                    message: "superseded by a newer search".to_string(),
                });
            }
            Err(err) => {
                drop(inner);
                warn!(error = %err, "search request failed; keeping previous results");
                let _ = self.events.send(ClientEvent::SearchFailed {
                    message: err.to_string(),
                });
            }
        }
        SearchOutcome::Accepted
    }

    /// Fire-and-forget training trigger. The busy indicator turns on
    /// immediately and clears after a fixed delay regardless of whether the
    /// request succeeded, failed, or the backend is still training.
    pub async fn trigger_training(self: &Arc<Self>) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.training.begin()
        };
        let _ = self.events.send(ClientEvent::TrainingStarted);
        info!("training trigger requested");

        let client = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = client.api.trigger_training().await {
                warn!(error = %err, "training trigger never reached the backend");
                let _ = client.events.send(ClientEvent::TrainingFailed {
                    message: err.to_string(),
                });
            }
        });

        let client = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(client.training_indicator).await;
            let cleared = {
                let mut inner = client.inner.lock().await;
                inner.training.clear(generation)
            };
            // A newer trigger owns the flag now; its own timer will clear it.
            if cleared {
                let _ = client.events.send(ClientEvent::TrainingIdle);
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
