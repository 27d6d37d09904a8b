//! Backend-to-UI events and error modeling for the dashboard controller.

use shared::domain::{Intent, RecommendationItem, SearchResultItem, UserStats};

pub enum UiEvent {
    Info(String),
    RecommendationsLoaded(Vec<RecommendationItem>),
    StatsLoaded(UserStats),
    SearchStarted,
    SearchCompleted {
        results: Vec<SearchResultItem>,
        intent: Intent,
    },
    /// A search settled without publishing anything new: the pending state
    /// ends, the previous results stay on screen.
    SearchSettled,
    TrainingStarted,
    TrainingIdle,
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Backend,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Training,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("unreachable")
            || message_lower.contains("connection")
            || message_lower.contains("timed out")
            || message_lower.contains("network")
            || message_lower.contains("dns")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else if message_lower.contains("backend returned")
            || message_lower.contains("status 5")
            || message_lower.contains("status 4")
        {
            UiErrorCategory::Backend
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
            || message_lower.contains("undecodable")
        {
            UiErrorCategory::Validation
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// One-line status text for the footer.
    pub fn status_line(&self) -> String {
        match self.context {
            UiErrorContext::BackendStartup => {
                format!("Backend worker failed to start: {}", self.message)
            }
            UiErrorContext::Training => {
                format!("Training request did not reach the backend: {}", self.message)
            }
            UiErrorContext::General => self.message.clone(),
        }
    }
}
