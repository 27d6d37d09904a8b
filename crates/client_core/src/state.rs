//! Per-flow state containers. Each flow owns a disjoint set of fields and
//! exposes only its legal transitions; no two flows write the same field.

use shared::domain::{Intent, RecommendationItem, SearchResultItem, UserStats};

/// State owned by the startup profile load.
#[derive(Debug, Clone, Default)]
pub struct ProfileState {
    pub recommendations: Vec<RecommendationItem>,
    pub stats: Option<UserStats>,
}

impl ProfileState {
    /// Wholesale replacement; generations never merge.
    pub fn publish_recommendations(&mut self, items: Vec<RecommendationItem>) {
        self.recommendations = items;
    }

    pub fn publish_stats(&mut self, stats: UserStats) {
        self.stats = Some(stats);
    }

    /// Stats arrived but the asynchronous LLM enrichment has not. A pending
    /// sub-state, not an error.
    pub fn llm_profile_pending(&self) -> bool {
        matches!(&self.stats, Some(stats) if stats.llm_profile.is_none())
    }
}

/// State owned by the search flow: an idle/pending cycle plus the last
/// published result generation.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub loading: bool,
    pub results: Vec<SearchResultItem>,
    pub intent: Option<Intent>,
}

impl SearchState {
    /// Enters the pending state; returns false if a search is already
    /// in flight (overlapping submissions are rejected, not queued).
    pub fn begin(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    /// Results and intent replace the previous generation together.
    pub fn publish(&mut self, results: Vec<SearchResultItem>, intent: Intent) {
        self.results = results;
        self.intent = Some(intent);
    }

    /// Releases the pending flag. Runs on every exit path of a submission,
    /// before the outcome is interpreted.
    pub fn settle(&mut self) {
        self.loading = false;
    }
}

/// State owned by the training trigger. The busy flag is a cosmetic
/// "recently triggered" indicator on a fixed timer, deliberately decoupled
/// from the backend job's actual lifetime.
#[derive(Debug, Clone, Default)]
pub struct TrainingState {
    pub busy: bool,
    generation: u64,
}

impl TrainingState {
    /// Marks the indicator busy and returns the generation token the
    /// matching clear must present.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.busy = true;
        self.generation
    }

    /// Clears the busy flag unless a newer trigger superseded this
    /// generation. Returns whether the flag was cleared.
    pub fn clear(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.busy = false;
        true
    }
}
