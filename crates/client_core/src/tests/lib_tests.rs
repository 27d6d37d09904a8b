use super::*;
use std::collections::VecDeque;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::{Explanation, LlmProfile, UserId},
    protocol::SearchRequest,
};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct BackendState {
    recommendation_hits: Arc<tokio::sync::Mutex<u32>>,
    stats_hits: Arc<tokio::sync::Mutex<u32>>,
    search_hits: Arc<tokio::sync::Mutex<u32>>,
    train_hits: Arc<tokio::sync::Mutex<u32>>,
    fail_recommendations: Arc<tokio::sync::Mutex<bool>>,
    fail_search: Arc<tokio::sync::Mutex<bool>>,
    omit_results_key: Arc<tokio::sync::Mutex<bool>>,
    omit_llm_profile: Arc<tokio::sync::Mutex<bool>>,
    stats_delay: Arc<tokio::sync::Mutex<Option<Duration>>>,
    search_delay: Arc<tokio::sync::Mutex<Option<Duration>>>,
    // Scripted per-request recommendation responses (delay, payload); when
    // empty the handler serves the default sample.
    recommendation_plans: Arc<tokio::sync::Mutex<VecDeque<(Duration, Vec<RecommendationItem>)>>>,
}

fn sample_recommendations() -> Vec<RecommendationItem> {
    vec![
        RecommendationItem {
            stock_code: "85123A".to_string(),
            description: "WHITE HANGING HEART T-LIGHT HOLDER".to_string(),
            score: 0.91,
            explanation: Some(Explanation {
                reason: "Matches your home decor purchases".to_string(),
                match_factors: vec!["Category Affinity".to_string(), "Price Match".to_string()],
            }),
        },
        RecommendationItem {
            stock_code: "71053".to_string(),
            description: "WHITE METAL LANTERN".to_string(),
            score: 0.47,
            explanation: None,
        },
    ]
}

fn sample_stats(with_llm_profile: bool) -> UserStats {
    UserStats {
        total_spent: 1243.75,
        order_count: 31,
        top_categories: vec!["Home".to_string(), "Garden".to_string()],
        llm_profile: with_llm_profile.then(|| LlmProfile {
            persona: "Seasonal decor enthusiast".to_string(),
            price_sensitivity: "Moderate".to_string(),
            best_time: "Weekends".to_string(),
        }),
    }
}

async fn handle_recommendations(
    State(state): State<BackendState>,
    Path(_user_id): Path<String>,
) -> Response {
    *state.recommendation_hits.lock().await += 1;
    if *state.fail_recommendations.lock().await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "recommender offline"})),
        )
            .into_response();
    }
    let plan = state.recommendation_plans.lock().await.pop_front();
    if let Some((delay, payload)) = plan {
        tokio::time::sleep(delay).await;
        return Json(payload).into_response();
    }
    Json(sample_recommendations()).into_response()
}

async fn handle_stats(State(state): State<BackendState>, Path(_user_id): Path<String>) -> Response {
    *state.stats_hits.lock().await += 1;
    let delay = *state.stats_delay.lock().await;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let with_llm_profile = !*state.omit_llm_profile.lock().await;
    Json(sample_stats(with_llm_profile)).into_response()
}

async fn handle_search(
    State(state): State<BackendState>,
    Json(body): Json<SearchRequest>,
) -> Response {
    *state.search_hits.lock().await += 1;
    let delay = *state.search_delay.lock().await;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if *state.fail_search.lock().await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "search index unavailable"})),
        )
            .into_response();
    }
    if *state.omit_results_key.lock().await {
        return Json(json!({
            "intent": {
                "intent": "general",
                "category": "general",
                "features": [],
                "budget": null,
                "use_case": null,
            }
        }))
        .into_response();
    }
    let category = if body.query.contains("gift") {
        "gifts"
    } else {
        "kitchen"
    };
    Json(json!({
        "results": [{
            "stock_code": format!("SC-{}", body.query.len()),
            "description": body.query.to_uppercase(),
            "score": 0.87,
        }],
        "intent": {
            "intent": "transactional",
            "category": category,
            "features": ["white"],
            "budget": "under £50",
            "use_case": null,
        }
    }))
    .into_response()
}

async fn handle_train(State(state): State<BackendState>) -> Response {
    *state.train_hits.lock().await += 1;
    Json(json!({"message": "Training started in background."})).into_response()
}

async fn spawn_backend(state: BackendState) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    let app = Router::new()
        .route(
            "/users/:user_id/recommendations",
            get(handle_recommendations),
        )
        .route("/users/:user_id/stats", get(handle_stats))
        .route("/search", post(handle_search))
        .route("/train", post(handle_train))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn test_client(server_url: &str, training_indicator: Duration) -> Arc<DashboardClient> {
    DashboardClient::new_with_dependencies(
        Arc::new(HttpRecommenderApi::new(server_url)),
        UserId::new("12350"),
        training_indicator,
    )
}

async fn recv_until<F>(rx: &mut broadcast::Receiver<ClientEvent>, mut matcher: F) -> ClientEvent
where
    F: FnMut(&ClientEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = rx.recv().await.expect("event stream closed");
            if matcher(&event) {
                break event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test]
async fn profile_legs_publish_independently_as_each_settles() {
    let state = BackendState::default();
    *state.stats_delay.lock().await = Some(Duration::from_millis(250));
    let server_url = spawn_backend(state).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    let mut rx = client.subscribe_events();
    assert!(client.load_profile().await);

    // Recommendations settle long before the delayed stats leg, so their
    // event must arrive first.
    let first = rx.recv().await.expect("first event");
    assert!(
        matches!(first, ClientEvent::RecommendationsLoaded(_)),
        "expected recommendations before delayed stats"
    );
    let second = rx.recv().await.expect("second event");
    assert!(matches!(second, ClientEvent::StatsLoaded(_)));

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.profile.recommendations.len(), 2);
    assert_eq!(
        snapshot.profile.stats.as_ref().map(|s| s.order_count),
        Some(31)
    );
}

#[tokio::test]
async fn profile_loads_exactly_once_per_session() {
    let state = BackendState::default();
    let server_url = spawn_backend(state.clone()).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    assert!(client.load_profile().await);
    assert!(!client.load_profile().await);

    assert_eq!(*state.recommendation_hits.lock().await, 1);
    assert_eq!(*state.stats_hits.lock().await, 1);
}

#[tokio::test]
async fn failed_recommendations_leg_keeps_empty_list_and_stats_still_load() {
    let state = BackendState::default();
    *state.fail_recommendations.lock().await = true;
    let server_url = spawn_backend(state).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    let mut rx = client.subscribe_events();
    client.load_profile().await;

    let snapshot = client.snapshot().await;
    assert!(snapshot.profile.recommendations.is_empty());
    assert!(snapshot.profile.stats.is_some());

    // The failed leg published nothing; the only event is the stats leg's.
    let event = rx.try_recv().expect("stats event");
    assert!(matches!(event, ClientEvent::StatsLoaded(_)));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn stats_without_llm_profile_is_a_pending_substate() {
    let state = BackendState::default();
    *state.omit_llm_profile.lock().await = true;
    let server_url = spawn_backend(state).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    client.load_profile().await;

    let snapshot = client.snapshot().await;
    assert!(snapshot.profile.llm_profile_pending());
    assert_eq!(
        snapshot.profile.stats.as_ref().map(|s| s.order_count),
        Some(31)
    );
}

#[tokio::test]
async fn whitespace_queries_never_touch_the_network() {
    let state = BackendState::default();
    let server_url = spawn_backend(state.clone()).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    assert_eq!(
        client.submit_search("").await,
        SearchOutcome::Rejected(RejectReason::EmptyQuery)
    );
    assert_eq!(
        client.submit_search("   ").await,
        SearchOutcome::Rejected(RejectReason::EmptyQuery)
    );

    assert_eq!(*state.search_hits.lock().await, 0);
    assert!(!client.snapshot().await.search.loading);
}

#[tokio::test]
async fn search_enters_pending_and_always_releases_it() {
    let state = BackendState::default();
    *state.search_delay.lock().await = Some(Duration::from_millis(200));
    let server_url = spawn_backend(state).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    let submitting = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.submit_search("gifts under £50").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.snapshot().await.search.loading);

    assert_eq!(submitting.await.expect("join"), SearchOutcome::Accepted);

    let snapshot = client.snapshot().await;
    assert!(!snapshot.search.loading);
    assert_eq!(snapshot.search.results.len(), 1);
    assert_eq!(
        snapshot.search.intent.as_ref().map(|i| i.category.as_str()),
        Some("gifts")
    );
}

#[tokio::test]
async fn search_failure_releases_pending_and_keeps_previous_generation() {
    let state = BackendState::default();
    let server_url = spawn_backend(state.clone()).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);
    let mut rx = client.subscribe_events();

    assert_eq!(
        client.submit_search("ceramic teapot").await,
        SearchOutcome::Accepted
    );
    let before = client.snapshot().await;

    *state.fail_search.lock().await = true;
    assert_eq!(
        client.submit_search("red lamp").await,
        SearchOutcome::Accepted
    );
    recv_until(&mut rx, |event| {
        matches!(event, ClientEvent::SearchFailed { .. })
    })
    .await;

    let after = client.snapshot().await;
    assert!(!after.search.loading);
    assert_eq!(after.search.results, before.search.results);
    assert_eq!(after.search.intent, before.search.intent);
}

#[tokio::test]
async fn overlapping_submission_is_rejected_until_the_flight_settles() {
    let state = BackendState::default();
    *state.search_delay.lock().await = Some(Duration::from_millis(250));
    let server_url = spawn_backend(state.clone()).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    let first = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.submit_search("wooden toys").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        client.submit_search("another query").await,
        SearchOutcome::Rejected(RejectReason::SearchPending)
    );

    assert_eq!(first.await.expect("join"), SearchOutcome::Accepted);
    assert_eq!(*state.search_hits.lock().await, 1);

    *state.search_delay.lock().await = None;
    assert_eq!(
        client.submit_search("another query").await,
        SearchOutcome::Accepted
    );
}

#[tokio::test]
async fn response_without_results_key_publishes_empty_set_not_error() {
    let state = BackendState::default();
    let server_url = spawn_backend(state.clone()).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    client.submit_search("storage jars").await;
    assert_eq!(client.snapshot().await.search.results.len(), 1);

    *state.omit_results_key.lock().await = true;
    let mut rx = client.subscribe_events();
    assert_eq!(
        client.submit_search("something obscure").await,
        SearchOutcome::Accepted
    );
    recv_until(&mut rx, |event| {
        matches!(event, ClientEvent::SearchCompleted { .. })
    })
    .await;

    let snapshot = client.snapshot().await;
    assert!(!snapshot.search.loading);
    // Wholesale replacement: the previous generation is gone.
    assert!(snapshot.search.results.is_empty());
    let intent = snapshot.search.intent.expect("intent published");
    assert!(!intent.is_actionable());
}

#[tokio::test]
async fn back_to_back_searches_replace_results_wholesale() {
    let state = BackendState::default();
    let server_url = spawn_backend(state).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    client.submit_search("first query").await;
    let first = client.snapshot().await.search.results;
    assert_eq!(first.len(), 1);

    client.submit_search("a much longer second query").await;
    let second = client.snapshot().await.search.results;
    assert_eq!(second.len(), 1);
    assert_ne!(second[0].stock_code, first[0].stock_code);
    assert_eq!(second[0].description, "A MUCH LONGER SECOND QUERY");
}

#[tokio::test]
async fn training_sets_busy_instantly_and_clears_after_the_fixed_delay() {
    let state = BackendState::default();
    let server_url = spawn_backend(state.clone()).await;
    let client = test_client(&server_url, Duration::from_millis(120));
    let mut rx = client.subscribe_events();

    client.trigger_training().await;
    assert!(client.snapshot().await.training.busy);

    recv_until(&mut rx, |event| matches!(event, ClientEvent::TrainingIdle)).await;
    assert!(!client.snapshot().await.training.busy);
    assert_eq!(*state.train_hits.lock().await, 1);
}

#[tokio::test]
async fn training_indicator_clears_even_when_the_backend_is_unreachable() {
    // Nothing listens on this port; the POST fails outright.
    let client = test_client("http://127.0.0.1:9", Duration::from_millis(120));
    let mut rx = client.subscribe_events();

    client.trigger_training().await;
    assert!(client.snapshot().await.training.busy);

    recv_until(&mut rx, |event| {
        matches!(event, ClientEvent::TrainingFailed { .. })
    })
    .await;
    recv_until(&mut rx, |event| matches!(event, ClientEvent::TrainingIdle)).await;
    assert!(!client.snapshot().await.training.busy);
}

#[tokio::test]
async fn stale_training_timer_cannot_clear_a_newer_trigger() {
    let state = BackendState::default();
    let server_url = spawn_backend(state).await;
    let client = test_client(&server_url, Duration::from_millis(300));
    let mut rx = client.subscribe_events();

    client.trigger_training().await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    client.trigger_training().await;

    // The first trigger's timer has fired by now but its generation is
    // stale; the flag stays busy until the second timer runs out.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(client.snapshot().await.training.busy);

    recv_until(&mut rx, |event| matches!(event, ClientEvent::TrainingIdle)).await;
    assert!(!client.snapshot().await.training.busy);
}

#[tokio::test]
async fn reload_drops_stale_profile_responses_from_a_superseded_generation() {
    let state = BackendState::default();
    {
        let mut plans = state.recommendation_plans.lock().await;
        plans.push_back((
            Duration::from_millis(300),
            vec![RecommendationItem {
                stock_code: "OLD".to_string(),
                description: "FROM THE SUPERSEDED LOAD".to_string(),
                score: 0.1,
                explanation: None,
            }],
        ));
        plans.push_back((
            Duration::ZERO,
            vec![RecommendationItem {
                stock_code: "NEW".to_string(),
                description: "FROM THE RELOAD".to_string(),
                score: 0.9,
                explanation: None,
            }],
        ));
    }
    let server_url = spawn_backend(state).await;
    let client = test_client(&server_url, DEFAULT_TRAINING_INDICATOR);

    let slow_load = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.load_profile().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.reload_profile().await;
    slow_load.await.expect("join");

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.profile.recommendations.len(), 1);
    assert_eq!(snapshot.profile.recommendations[0].stock_code, "NEW");
}
