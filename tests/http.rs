use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// What the fake plans backend answers, plus what it has seen.
struct MockBackend {
    plans_status: u16,
    plans: Value,
    categories: Value,
    publish_status: u16,
    publish_error_body: String,
    publish_calls: usize,
    last_payload: Option<Value>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            plans_status: 200,
            plans: json!([]),
            categories: json!([]),
            publish_status: 200,
            publish_error_body: String::new(),
            publish_calls: 0,
            last_payload: None,
        }
    }
}

type Shared = Arc<StdMutex<MockBackend>>;

static BACKEND: Lazy<Shared> = Lazy::new(|| Arc::new(StdMutex::new(MockBackend::default())));
static BACKEND_URL: Lazy<String> = Lazy::new(|| start_mock_backend(Arc::clone(&BACKEND)));

#[derive(Debug, Deserialize)]
struct StatsResponse {
    error: Option<String>,
    kpis: Option<Value>,
    daily_publish: Vec<Value>,
    by_category: Vec<Value>,
    top_viewed: Vec<Value>,
    cost_histogram: Vec<Value>,
    priority_views: Vec<Value>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static UNREACHABLE_SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PIDS: [AtomicI32; 4] = [const { AtomicI32::new(0) }; 4];
    static NEXT: AtomicUsize = AtomicUsize::new(0);

    pub fn register(pid: u32) {
        if let Some(slot) = PIDS.get(NEXT.fetch_add(1, Ordering::SeqCst)) {
            slot.store(pid as i32, Ordering::SeqCst);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        for slot in &PIDS {
            let pid = slot.load(Ordering::SeqCst);
            if pid > 0 {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
        }
    }
}

// The backend outlives any single test runtime, so it gets its own thread.
fn start_mock_backend(shared: Shared) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock backend");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let port = listener.local_addr().unwrap().port();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("mock backend runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            let app = Router::new()
                .route("/plans", get(mock_plans))
                .route("/plans/publish", post(mock_publish))
                .route("/plans/category/:id", get(mock_plans_by_category))
                .route("/categories", get(mock_categories))
                .with_state(shared);
            axum::serve(listener, app).await.expect("mock backend");
        });
    });

    format!("http://127.0.0.1:{port}")
}

async fn mock_plans(State(shared): State<Shared>) -> Response {
    let backend = shared.lock().unwrap();
    let status = StatusCode::from_u16(backend.plans_status).unwrap();
    if status.is_success() {
        Json(backend.plans.clone()).into_response()
    } else {
        (status, "internal failure").into_response()
    }
}

async fn mock_plans_by_category(
    State(shared): State<Shared>,
    Path(id): Path<i64>,
) -> Json<Value> {
    let backend = shared.lock().unwrap();
    let matching: Vec<Value> = backend
        .plans
        .as_array()
        .map(|plans| {
            plans
                .iter()
                .filter(|p| p["category"].as_i64() == Some(id))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(Value::Array(matching))
}

async fn mock_categories(State(shared): State<Shared>) -> Json<Value> {
    Json(shared.lock().unwrap().categories.clone())
}

async fn mock_publish(State(shared): State<Shared>, Json(payload): Json<Value>) -> Response {
    let mut backend = shared.lock().unwrap();
    backend.publish_calls += 1;
    backend.last_payload = Some(payload.clone());

    let status = StatusCode::from_u16(backend.publish_status).unwrap();
    if !status.is_success() {
        return (status, backend.publish_error_body.clone()).into_response();
    }

    let mut created = payload;
    created["id"] = json!(99);
    created["views"] = json!(0);
    created["assistance"] = json!(0);
    Json(created).into_response()
}

fn reset_backend(configure: impl FnOnce(&mut MockBackend)) {
    let mut backend = BACKEND.lock().unwrap();
    *backend = MockBackend::default();
    configure(&mut backend);
}

fn publish_calls() -> usize {
    BACKEND.lock().unwrap().publish_calls
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/healthz")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(backend_url: &str) -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_plans_dashboard"))
        .env("PORT", port.to_string())
        .env("PLANS_API_URL", backend_url)
        .env("PLANS_API_TIMEOUT_SECS", "2")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(BACKEND_URL.as_str()).await);
    *guard = Some(Arc::clone(&server));
    server
}

// Nothing listens on the backend port, so every backend call is refused.
async fn unreachable_backend_server() -> Arc<TestServer> {
    let mut guard = UNREACHABLE_SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let closed = format!("http://127.0.0.1:{}", pick_free_port());
    let server = Arc::new(spawn_server(&closed).await);
    *guard = Some(Arc::clone(&server));
    server
}

fn sample_plans() -> Value {
    json!([
        {"id": 1, "name": "Morning Yoga", "date": "2099-01-10T08:00:00", "category": 2,
         "isActive": true, "views": 40, "assistance": 0, "priority": 3, "costEstimate": 10.0,
         "description": "Stretching in the park", "location": "Central park"},
        {"id": 2, "name": "Jazz Night", "date": "2000-05-01T21:00:00", "category": 1,
         "isActive": false, "views": 90, "assistance": 12, "priority": 8, "costEstimate": 25.0},
        {"id": 3, "name": "yoga retreat", "date": "2099-02-01T09:00", "category": 2,
         "isActive": false, "views": 5, "assistance": 1, "priority": 6, "costEstimate": 300.0}
    ])
}

#[tokio::test]
async fn http_publish_short_name_is_rejected_without_backend_call() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|_| {});
    let client = Client::new();

    let response = client
        .post(format!("{}/api/plans/publish", server.base_url))
        .json(&json!({
            "name": "AB",
            "description": "A perfectly long description",
            "date": "2026-03-15T10:00",
            "category": 1
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("at least 3 characters"));
    assert_eq!(publish_calls(), 0);
}

#[tokio::test]
async fn http_publish_forwards_normalised_payload() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|_| {});
    let client = Client::new();

    let response = client
        .post(format!("{}/api/plans/publish", server.base_url))
        .json(&json!({
            "name": "  Board games  ",
            "description": "Bring your favourite game along",
            "date": "2026-03-15T10:00",
            "category": "4",
            "isActive": false
        }))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["id"], 99);
    assert_eq!(created["name"], "Board games");

    let payload = BACKEND.lock().unwrap().last_payload.clone().unwrap();
    assert_eq!(payload["date"], "2026-03-15T10:00:00");
    assert_eq!(payload["priority"], 5);
    assert_eq!(payload["category"], 4);
    assert_eq!(payload["isActive"], false);
    assert_eq!(payload["costEstimate"], 0.0);
    assert_eq!(payload["imageUrl"], "");
    assert!(payload.get("id").is_none());
    assert_eq!(publish_calls(), 1);
}

#[tokio::test]
async fn http_publish_surfaces_backend_status_and_body() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|b| {
        b.publish_status = 400;
        b.publish_error_body = "category 42 does not exist".to_string();
    });
    let client = Client::new();

    let response = client
        .post(format!("{}/api/plans/publish", server.base_url))
        .json(&json!({
            "name": "Chess club",
            "description": "Weekly chess for all levels",
            "date": "2026-04-01T18:00:00",
            "category": 42
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 400);
    assert_eq!(body["body"], "category 42 does not exist");
    assert_eq!(body["error"], "Error 400: category 42 does not exist");

    let html = client
        .post(format!("{}/create", server.base_url))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(concat!(
            "name=Chess+club&description=Weekly+chess+for+all+levels",
            "&date=2026-04-01T18%3A00&category=42&isActive=true",
        ))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Error 400: category 42 does not exist"));
    assert_eq!(publish_calls(), 2);
}

#[tokio::test]
async fn http_create_form_lists_all_validation_errors() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|_| {});

    let html = Client::new()
        .post(format!("{}/create", server.base_url))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=AB&description=short&date=&priority=12&category=")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(html.contains("Name must be at least 3 characters"));
    assert!(html.contains("Description must be at least 10 characters"));
    assert!(html.contains("Date is required"));
    assert!(html.contains("Priority must be between 1 and 10"));
    assert!(html.contains("Category is required"));
    assert_eq!(publish_calls(), 0);
}

#[tokio::test]
async fn http_all_plans_empty_list_shows_empty_state() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|_| {});

    let html = Client::new()
        .get(format!("{}/all-plans", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(html.contains("No plans found"));
    assert!(!html.contains("<table"));
}

#[tokio::test]
async fn http_dashboard_backend_failure_empties_every_chart() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|b| b.plans_status = 500);
    let client = Client::new();

    let stats: StatsResponse = client
        .get(format!("{}/api/stats", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.error.as_deref(), Some("Could not load plans from the backend"));
    assert!(stats.kpis.is_none());
    assert!(stats.daily_publish.is_empty());
    assert!(stats.by_category.is_empty());
    assert!(stats.top_viewed.is_empty());
    assert!(stats.cost_histogram.is_empty());
    assert!(stats.priority_views.is_empty());

    let html = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Could not load plans from the backend"));
    assert!(!html.contains("internal failure"));
}

#[tokio::test]
async fn http_stats_aggregate_fetched_plans() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|b| b.plans = sample_plans());

    let stats: StatsResponse = Client::new()
        .get(format!("{}/api/stats", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let kpis = stats.kpis.expect("kpis");
    assert!(stats.error.is_none());
    assert_eq!(kpis["total"], 3);
    assert_eq!(kpis["active"], 1);
    assert_eq!(kpis["expired"], 1);
    assert_eq!(kpis["upcoming_all"], 2);
    assert_eq!(kpis["max_views"], 90);
    assert_eq!(kpis["zero_assistance"], 1);
    assert_eq!(stats.daily_publish.len(), 41);
    assert_eq!(stats.by_category, vec![json!({"category": 2, "count": 1})]);
    assert_eq!(stats.top_viewed[0]["name"], "Jazz Night");
    assert_eq!(stats.priority_views.len(), 3);
}

#[tokio::test]
async fn http_plans_filter_by_search_and_status() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|b| b.plans = sample_plans());
    let client = Client::new();

    let plans: Vec<Value> = client
        .get(format!("{}/api/plans?q=YOGA", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<_> = plans.iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 3]);

    let plans: Vec<Value> = client
        .get(format!("{}/api/plans?q=yoga&status=inactive", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<_> = plans.iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![3]);

    let html = client
        .get(format!("{}/all-plans?q=jazz&sort=views&dir=desc", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<table"));
    assert!(html.contains("Jazz Night"));
    assert!(!html.contains("Morning Yoga"));
    assert!(html.contains("Showing 1 of 3 plans."));
}

#[tokio::test]
async fn http_categories_page_renders_backend_columns() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|b| {
        b.categories = json!([
            {"id": 1, "name": "Music"},
            {"id": 2, "name": "Outdoors"}
        ]);
    });

    let html = Client::new()
        .get(format!("{}/categories", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<th>id</th>"));
    assert!(html.contains("<th>name</th>"));
    assert!(html.contains("<td>Outdoors</td>"));
}

#[tokio::test]
async fn http_by_category_renders_cards_and_rejects_bad_ids() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|b| b.plans = sample_plans());
    let client = Client::new();

    let html = client
        .get(format!("{}/by-category?id=2", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Morning Yoga"));
    assert!(html.contains("yoga retreat"));
    assert!(!html.contains("Jazz Night"));

    let html = client
        .get(format!("{}/by-category?id=7", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("No plans in this category"));

    let html = client
        .get(format!("{}/by-category?id=abc", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Category ID must be a whole number"));
}

#[tokio::test]
async fn http_unknown_path_falls_back_to_dashboard() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|_| {});

    let response = Client::new()
        .get(format!("{}/does-not-exist", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains(r#"<a class="nav-link active" href="/">Dashboard</a>"#));
    assert!(html.contains("chart-daily"));
}

#[tokio::test]
async fn http_trailing_slash_serves_the_matching_page() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    reset_backend(|b| b.plans = sample_plans());
    let client = Client::new();

    let html = client
        .get(format!("{}/all-plans/?q=yoga&status=inactive", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(r#"<a class="nav-link active" href="/all-plans">All plans</a>"#));
    assert!(!html.contains(r#"<a class="nav-link active" href="/">Dashboard</a>"#));
    assert!(html.contains("yoga retreat"));
    assert!(!html.contains("Morning Yoga"));

    let html = client
        .get(format!("{}/by-category/?id=abc", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(r#"<a class="nav-link active" href="/by-category">"#));
    assert!(html.contains("Category ID must be a whole number"));
}

#[tokio::test]
async fn http_unreachable_backend_reports_the_root_cause() {
    let _guard = TEST_LOCK.lock().await;
    let server = unreachable_backend_server().await;
    let client = Client::new();

    let html = client
        .get(format!("{}/all-plans", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.to_lowercase().contains("connection refused"));

    let response = client
        .post(format!("{}/api/plans/publish", server.base_url))
        .json(&json!({
            "name": "Chess club",
            "description": "Weekly chess for all levels",
            "date": "2026-04-01T18:00:00",
            "category": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await.unwrap();
    let error = body["error"].as_str().unwrap().to_lowercase();
    assert!(error.contains("connection refused"), "error was {error}");
    assert!(body.get("status").is_none());
}
