//! Backend worker thread: owns the tokio runtime and the `DashboardClient`,
//! turning queued UI commands into orchestration calls and client events
//! into UI events.

use std::{sync::Arc, thread};

use client_core::{ClientEvent, DashboardClient, SearchOutcome};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::UserId;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn spawn_backend_thread(
    server_url: String,
    user_id: UserId,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build backend runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = DashboardClient::new(server_url, user_id);
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            let mut events = client.subscribe_events();
            let ui_tx_events = ui_tx.clone();
            tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let forwarded = match event {
                        ClientEvent::RecommendationsLoaded(items) => {
                            UiEvent::RecommendationsLoaded(items)
                        }
                        ClientEvent::StatsLoaded(stats) => UiEvent::StatsLoaded(stats),
                        ClientEvent::SearchStarted { .. } => UiEvent::SearchStarted,
                        ClientEvent::SearchCompleted { results, intent } => {
                            UiEvent::SearchCompleted { results, intent }
                        }
                        // Search failures are silent for the user: log only,
                        // keep whatever was on screen, end the pending state.
                        ClientEvent::SearchFailed { message } => {
                            tracing::warn!(error = %message, "search failed; keeping previous results");
                            UiEvent::SearchSettled
                        }
                        ClientEvent::TrainingStarted => UiEvent::TrainingStarted,
                        ClientEvent::TrainingFailed { message } => UiEvent::Error(
                            UiError::from_message(UiErrorContext::Training, message),
                        ),
                        ClientEvent::TrainingIdle => UiEvent::TrainingIdle,
                    };
                    let _ = ui_tx_events.try_send(forwarded);
                }
            });

            // Each command runs on its own task so the three flows stay
            // independent; a slow search cannot delay a training trigger.
            while let Ok(cmd) = cmd_rx.recv() {
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    match cmd {
                        BackendCommand::LoadProfile => {
                            client.load_profile().await;
                        }
                        BackendCommand::ReloadProfile => client.reload_profile().await,
                        BackendCommand::SubmitSearch { query } => {
                            if let SearchOutcome::Rejected(reason) =
                                client.submit_search(&query).await
                            {
                                tracing::debug!(?reason, "search submission rejected");
                            }
                        }
                        BackendCommand::TriggerTraining => client.trigger_training().await,
                    }
                });
            }
        });
    });
}
