//! Read-only dashboard view over the orchestration state. All data flows in
//! through `UiEvent`s; the only things flowing out are backend commands for
//! user-initiated actions.

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::domain::{Intent, RecommendationItem, SearchResultItem, UserStats};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::controller::orchestration::dispatch_backend_command;

pub const SETTINGS_STORAGE_KEY: &str = "dashboard_settings_v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedDashboardSettings {
    pub query: String,
}

/// Search scores arrive normalized to [0, 1] and display as percentages.
fn format_search_score(score: f32) -> String {
    format!("{:.0}%", score * 100.0)
}

/// Recommendation scores are raw recommender output and stay raw floats;
/// the two formats are intentionally not unified.
fn format_recommendation_score(score: f32) -> String {
    format!("{score:.2}")
}

/// The interpretation panel only shows for an actionable intent; the
/// classifier's "general" fallback means it extracted nothing useful.
fn intent_panel_visible(intent: Option<&Intent>) -> bool {
    intent.map(Intent::is_actionable).unwrap_or(false)
}

pub struct DashboardApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    query: String,
    recommendations: Vec<RecommendationItem>,
    stats: Option<UserStats>,
    results: Vec<SearchResultItem>,
    intent: Option<Intent>,
    loading: bool,
    training: bool,
    status: String,
    profile_requested: bool,
}

impl DashboardApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        persisted: Option<PersistedDashboardSettings>,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            query: persisted.map(|s| s.query).unwrap_or_default(),
            recommendations: Vec::new(),
            stats: None,
            results: Vec::new(),
            intent: None,
            loading: false,
            training: false,
            status: String::new(),
            profile_requested: false,
        }
    }

    fn drain_backend_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => self.status = message,
                UiEvent::RecommendationsLoaded(items) => self.recommendations = items,
                UiEvent::StatsLoaded(stats) => self.stats = Some(stats),
                UiEvent::SearchStarted => {
                    self.loading = true;
                    self.status = "Searching…".to_string();
                }
                UiEvent::SearchCompleted { results, intent } => {
                    self.loading = false;
                    self.status = format!("{} result(s)", results.len());
                    self.results = results;
                    self.intent = Some(intent);
                }
                UiEvent::SearchSettled => {
                    self.loading = false;
                    self.status.clear();
                }
                UiEvent::TrainingStarted => {
                    self.training = true;
                    self.status = "Model training started in the background".to_string();
                }
                UiEvent::TrainingIdle => {
                    self.training = false;
                }
                UiEvent::Error(err) => {
                    tracing::warn!(context = ?err.context(), category = ?err.category(), "{}", err.message());
                    self.status = err.status_line();
                }
            }
        }
    }

    fn can_submit(&self) -> bool {
        !self.loading && !self.query.trim().is_empty()
    }

    fn submit_query(&mut self) {
        if !self.can_submit() {
            return;
        }
        let query = self.query.trim().to_string();
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::SubmitSearch { query },
            &mut self.status,
        );
    }

    fn header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Retail Recommender");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let label = if self.training {
                    "Training model…"
                } else {
                    "Retrain model"
                };
                if ui
                    .add_enabled(!self.training, egui::Button::new(label))
                    .clicked()
                {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::TriggerTraining,
                        &mut self.status,
                    );
                }
            });
        });
    }

    fn profile_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Your profile");
        match &self.stats {
            Some(stats) => {
                egui::Grid::new("profile_stats")
                    .num_columns(2)
                    .show(ui, |ui| {
                        ui.label("Orders");
                        ui.label(stats.order_count.to_string());
                        ui.end_row();
                        ui.label("Total spent");
                        ui.label(format!("£{:.2}", stats.total_spent));
                        ui.end_row();
                        ui.label("Top categories");
                        ui.label(stats.top_categories.join(", "));
                        ui.end_row();
                    });
                match &stats.llm_profile {
                    Some(profile) => {
                        ui.label(format!(
                            "{} · price sensitivity: {} · best time: {}",
                            profile.persona, profile.price_sensitivity, profile.best_time
                        ));
                    }
                    None => {
                        ui.weak("Profile insights are still being generated…");
                    }
                }
            }
            None => {
                ui.weak("Loading profile…");
            }
        }
    }

    fn search_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Search");
        ui.horizontal(|ui| {
            let input = ui.add_enabled(
                !self.loading,
                egui::TextEdit::singleline(&mut self.query)
                    .hint_text("e.g. gifts under £50")
                    .desired_width(360.0),
            );
            let button_label = if self.loading { "Searching…" } else { "Search" };
            let clicked = ui
                .add_enabled(self.can_submit(), egui::Button::new(button_label))
                .clicked();
            let entered =
                input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if clicked || entered {
                self.submit_query();
            }
        });

        if intent_panel_visible(self.intent.as_ref()) {
            if let Some(intent) = &self.intent {
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.label(egui::RichText::new("Interpreted query").strong());
                    ui.label(format!(
                        "Intent: {} · Category: {}",
                        intent.intent, intent.category
                    ));
                    if let Some(use_case) = &intent.use_case {
                        ui.label(format!("Use case: {use_case}"));
                    }
                    if let Some(budget) = &intent.budget {
                        ui.label(format!("Budget: {budget}"));
                    }
                    if !intent.features.is_empty() {
                        ui.label(format!("Features: {}", intent.features.join(", ")));
                    }
                });
            }
        }

        if !self.results.is_empty() {
            ui.add_space(4.0);
            egui::Grid::new("search_results")
                .striped(true)
                .num_columns(3)
                .show(ui, |ui| {
                    for item in &self.results {
                        ui.monospace(format_search_score(item.score));
                        ui.label(&item.description);
                        ui.weak(&item.stock_code);
                        ui.end_row();
                    }
                });
        }
    }

    fn recommendations_section(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Recommended for you");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Refresh").clicked() {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::ReloadProfile,
                        &mut self.status,
                    );
                }
            });
        });

        if self.recommendations.is_empty() {
            ui.weak("No recommendations yet — they will appear once your history is processed.");
            return;
        }

        for item in &self.recommendations {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&item.description).strong());
                    ui.weak(&item.stock_code);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.monospace(format_recommendation_score(item.score));
                    });
                });
                if let Some(explanation) = &item.explanation {
                    ui.label(&explanation.reason);
                    if !explanation.match_factors.is_empty() {
                        ui.weak(explanation.match_factors.join(" · "));
                    }
                }
            });
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_backend_events();

        // One automatic profile load per session; re-renders never re-run it.
        if !self.profile_requested {
            self.profile_requested = true;
            dispatch_backend_command(&self.cmd_tx, BackendCommand::LoadProfile, &mut self.status);
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| self.header(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(&self.status);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    self.profile_section(ui);
                    ui.separator();
                    self.search_section(ui);
                    ui.separator();
                    self.recommendations_section(ui);
                });
        });

        // Keep polling the bridge channel while the window is idle.
        ctx.request_repaint_after(std::time::Duration::from_millis(150));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedDashboardSettings {
            query: self.query.clone(),
        };
        if let Ok(text) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, text);
        }
    }
}
