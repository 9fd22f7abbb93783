/// Integration tests for the todod REST API.
/// Spins up a real server on a free port and drives it over HTTP.
use serde_json::{json, Value};
use std::sync::Arc;

use todod::{
    config::TodoConfig, rest, storage::Storage, storage::TaskRow, tasks::TaskService, ui::view,
    AppContext,
};

/// Start a server on a free port and return its base URL.
async fn start_test_server() -> String {
    let data_dir = tempfile::tempdir().unwrap().keep();
    let db_url = format!("sqlite://{}/todos.db", data_dir.display());
    let storage = Storage::connect(&db_url, 0).await.unwrap();

    let config = Arc::new(TodoConfig::new(
        None,
        Some(data_dir),
        Some(db_url),
        Some("warn".to_string()),
        None,
    ));
    let ctx = Arc::new(AppContext {
        config,
        tasks: TaskService::new(storage),
        started_at: std::time::Instant::now(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = rest::build_router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    // Give the server a moment to start accepting
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    format!("http://{addr}")
}

async fn create(
    client: &reqwest::Client,
    base: &str,
    name: &str,
    description: &str,
    deadline: Option<&str>,
) -> reqwest::Response {
    let mut body = json!({ "name": name, "description": description });
    if let Some(deadline) = deadline {
        body["deadline"] = json!(deadline);
    }
    client
        .post(format!("{base}/api/todos"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn create_validates_required_fields() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = create(&client, &base, "", "finish doc", None).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("name"));

    let resp = create(&client, &base, "Write spec", "   ", None).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("description"));

    // Nothing was persisted.
    let tasks: Vec<TaskRow> = client
        .get(format!("{base}/api/todos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn create_defaults_deadline_to_creation_time() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = create(&client, &base, "Write spec", "finish doc", None).await;
    assert_eq!(resp.status(), 201);
    let task: TaskRow = resp.json().await.unwrap();
    assert!(!task.completed);
    // Deadline was filled in by the service and matches the creation instant.
    let deadline = task.deadline.as_deref().unwrap();
    let parsed = chrono::DateTime::parse_from_rfc3339(deadline).unwrap();
    let created = chrono::DateTime::parse_from_rfc3339(&task.created_at).unwrap();
    assert!((parsed - created).num_seconds().abs() <= 1);
}

#[tokio::test]
async fn patch_unknown_id_is_404() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .patch(format!("{base}/api/todos/no-such-id"))
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn toggle_twice_restores_original_state() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    let task: TaskRow = create(&client, &base, "Write spec", "finish doc", None)
        .await
        .json()
        .await
        .unwrap();

    let toggled: TaskRow = client
        .patch(format!("{base}/api/todos/{}", task.id))
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(toggled.completed);

    let restored: TaskRow = client
        .patch(format!("{base}/api/todos/{}", task.id))
        .json(&json!({ "completed": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!restored.completed);
    assert_eq!(restored.name, task.name);
    assert_eq!(restored.description, task.description);
    assert_eq!(restored.deadline, task.deadline);
}

#[tokio::test]
async fn completed_task_sorts_after_open_tasks() {
    let base = start_test_server().await;
    let client = reqwest::Client::new();

    // One task with an early deadline, two open tasks due later.
    let spec: TaskRow = create(
        &client,
        &base,
        "Write spec",
        "finish doc",
        Some("2025-01-01T10:00:00Z"),
    )
    .await
    .json()
    .await
    .unwrap();
    create(&client, &base, "Ship", "release", Some("2025-06-01T10:00:00Z")).await;
    create(&client, &base, "Review", "read PR", Some("2025-03-01T10:00:00Z")).await;

    let fetch = || async {
        let mut tasks: Vec<TaskRow> = client
            .get(format!("{base}/api/todos"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        view::sort_for_display(&mut tasks);
        tasks
    };

    // Earliest deadline first while everything is open.
    let tasks = fetch().await;
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].id, spec.id);
    assert!(!tasks[0].completed);

    // Completing it moves it after all incomplete tasks.
    let resp = client
        .patch(format!("{base}/api/todos/{}", spec.id))
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let tasks = fetch().await;
    assert_eq!(tasks[2].id, spec.id);
    assert!(tasks[2].completed);
    assert!(!tasks[0].completed && !tasks[1].completed);
    // Open group keeps ascending deadline order.
    assert_eq!(tasks[0].name, "Review");
    assert_eq!(tasks[1].name, "Ship");
}
