//! Backend commands queued from UI to the backend worker.

pub enum BackendCommand {
    /// Startup profile load; ignored if already done this session.
    LoadProfile,
    /// Explicit refresh of recommendations and stats.
    ReloadProfile,
    SubmitSearch { query: String },
    TriggerTraining,
}
