use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use client_core::{ClientEvent, DashboardClient, SearchOutcome};
use shared::domain::UserId;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the recommendation backend API.
    #[arg(long, default_value = "http://127.0.0.1:8000/api/v1")]
    server_url: String,
    /// User whose profile and recommendations to fetch.
    #[arg(long)]
    user_id: String,
    /// Optional one-shot natural language search query.
    #[arg(long)]
    query: Option<String>,
    /// Trigger a model retraining run after printing the profile.
    #[arg(long)]
    train: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let client = DashboardClient::new(args.server_url, UserId::new(args.user_id));
    client.load_profile().await;
    let snapshot = client.snapshot().await;

    match &snapshot.profile.stats {
        Some(stats) => {
            println!(
                "Orders: {}  Total spent: £{:.2}",
                stats.order_count, stats.total_spent
            );
            println!("Top categories: {}", stats.top_categories.join(", "));
            match &stats.llm_profile {
                Some(profile) => println!(
                    "Persona: {} (price sensitivity: {}, best time: {})",
                    profile.persona, profile.price_sensitivity, profile.best_time
                ),
                None => println!("Profile insights are still being generated."),
            }
        }
        None => println!("No stats available for this user."),
    }

    if snapshot.profile.recommendations.is_empty() {
        println!("No recommendations yet.");
    } else {
        println!("Recommendations:");
        for item in &snapshot.profile.recommendations {
            match &item.explanation {
                Some(explanation) => println!(
                    "  [{:.2}] {} ({}) — {}",
                    item.score, item.description, item.stock_code, explanation.reason
                ),
                None => println!(
                    "  [{:.2}] {} ({})",
                    item.score, item.description, item.stock_code
                ),
            }
        }
    }

    if let Some(query) = args.query {
        match client.submit_search(&query).await {
            SearchOutcome::Accepted => {
                let snapshot = client.snapshot().await;
                if let Some(intent) = snapshot.search.intent.as_ref().filter(|i| i.is_actionable())
                {
                    println!("Interpreted as {} / {}", intent.intent, intent.category);
                }
                if snapshot.search.results.is_empty() {
                    println!("No matches for \"{query}\".");
                }
                for item in &snapshot.search.results {
                    println!(
                        "  {:>3.0}% {} ({})",
                        item.score * 100.0,
                        item.description,
                        item.stock_code
                    );
                }
            }
            SearchOutcome::Rejected(reason) => println!("Search rejected: {reason:?}"),
        }
    }

    if args.train {
        let mut events = client.subscribe_events();
        client.trigger_training().await;
        println!("Training trigger sent; the busy indicator is cosmetic only.");
        // Fire-and-forget, but give the request a moment to leave before the
        // process exits so an unreachable backend is still reported.
        let failed = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                match events.recv().await {
                    Ok(ClientEvent::TrainingFailed { message }) => break Some(message),
                    Ok(ClientEvent::TrainingIdle) => break None,
                    Ok(_) => continue,
                    Err(_) => break None,
                }
            }
        })
        .await
        .unwrap_or(None);
        if let Some(message) = failed {
            eprintln!("Training trigger never reached the backend: {message}");
        }
    }

    Ok(())
}
