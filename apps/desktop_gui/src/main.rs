mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use shared::domain::UserId;

use crate::backend_bridge::commands::BackendCommand;
use crate::backend_bridge::runtime::spawn_backend_thread;
use crate::controller::events::UiEvent;
use crate::ui::app::{DashboardApp, PersistedDashboardSettings, SETTINGS_STORAGE_KEY};

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the recommendation backend API.
    #[arg(long, default_value = "http://127.0.0.1:8000/api/v1")]
    server_url: String,
    /// User whose profile the dashboard displays.
    #[arg(long, default_value = "12350")]
    user_id: String,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    spawn_backend_thread(args.server_url, UserId::new(args.user_id), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Retail Recommender")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([820.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Retail Recommender",
        options,
        Box::new(|cc| {
            let persisted = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedDashboardSettings>(&text).ok())
            });
            Ok(Box::new(DashboardApp::new(cmd_tx, ui_rx, persisted)))
        }),
    )
}
