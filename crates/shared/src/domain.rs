use serde::{Deserialize, Serialize};

/// Backend user identifiers are opaque strings (retail customer ids), not
/// numeric keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// LLM-derived persona attached to `UserStats` by asynchronous backend
/// enrichment. Absent while the enrichment has not completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmProfile {
    pub persona: String,
    pub price_sensitivity: String,
    pub best_time: String,
}

/// Aggregate profile of one user, fetched once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_spent: f64,
    pub order_count: u32,
    pub top_categories: Vec<String>,
    #[serde(default)]
    pub llm_profile: Option<LlmProfile>,
}

/// Structured justification attached to a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub reason: String,
    #[serde(default)]
    pub match_factors: Vec<String>,
}

/// One suggested product. Scores are raw floats as produced by the
/// recommender; the display does not reformat them as percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub stock_code: String,
    pub description: String,
    pub score: f32,
    #[serde(default)]
    pub explanation: Option<Explanation>,
}

/// One matched product for a search query. Scores are normalized to [0, 1]
/// and displayed as percentages, unlike recommendation scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub stock_code: String,
    pub description: String,
    pub score: f32,
}

/// Category the intent classifier falls back to when it cannot extract
/// anything useful from the query.
pub const GENERAL_INTENT_CATEGORY: &str = "general";

/// Classified meaning of a free-text search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub intent: String,
    pub category: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub use_case: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
}

impl Intent {
    /// A "general" category is the classifier's no-useful-intent fallback;
    /// the interpretation panel is suppressed for it.
    pub fn is_actionable(&self) -> bool {
        self.category != GENERAL_INTENT_CATEGORY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_decode_without_llm_profile() {
        let stats: UserStats = serde_json::from_str(
            r#"{"total_spent": 412.5, "order_count": 17, "top_categories": ["Home", "Garden"]}"#,
        )
        .expect("decode");
        assert_eq!(stats.order_count, 17);
        assert!(stats.llm_profile.is_none());
    }

    #[test]
    fn recommendation_decodes_with_and_without_explanation() {
        let with: RecommendationItem = serde_json::from_str(
            r#"{"stock_code": "85123A", "description": "WHITE HANGING HEART", "score": 0.91,
                "explanation": {"reason": "Matches your home decor purchases", "match_factors": ["Brand Affinity"]}}"#,
        )
        .expect("decode with explanation");
        assert_eq!(
            with.explanation.as_ref().map(|e| e.match_factors.len()),
            Some(1)
        );

        let without: RecommendationItem = serde_json::from_str(
            r#"{"stock_code": "71053", "description": "WHITE METAL LANTERN", "score": 0.44}"#,
        )
        .expect("decode without explanation");
        assert!(without.explanation.is_none());
    }

    #[test]
    fn general_intent_is_not_actionable() {
        let intent: Intent = serde_json::from_str(
            r#"{"intent": "general", "category": "general", "budget": null}"#,
        )
        .expect("decode");
        assert!(!intent.is_actionable());
        assert!(intent.features.is_empty());

        let gift: Intent = serde_json::from_str(
            r#"{"intent": "gift", "category": "toys", "features": ["wooden"],
                "use_case": "birthday", "budget": "under £50"}"#,
        )
        .expect("decode");
        assert!(gift.is_actionable());
    }
}
