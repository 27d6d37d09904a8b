use serde::{Deserialize, Serialize};

use crate::domain::{Intent, SearchResultItem};

/// Body of `POST /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// Response of `POST /search`.
///
/// A response with the `results` key absent decodes as an empty result set;
/// only a body that fails to decode entirely is treated as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResultItem>,
    pub intent: Intent,
}
