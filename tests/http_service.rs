use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use core_notes::api::{HttpTaskService, ServiceError, TaskService};
use core_notes::controller::{Controller, Settled};
use core_notes::models::{NewTask, Task, TaskColor, TaskFilters, TaskPatch, TaskStatus};

#[derive(Default)]
struct Store {
    tasks: Vec<Task>,
    next_id: u32,
    queries: Vec<Option<String>>,
    patches: Vec<Value>,
}

type Shared = Arc<Mutex<Store>>;
type ApiError = (StatusCode, Json<Value>);

fn not_found(id: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "message": format!("Task {id} not found") })))
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message })))
}

fn query_value(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.replace('+', " "))
    })
}

async fn list(State(store): State<Shared>, RawQuery(query): RawQuery) -> Json<Value> {
    let mut store = store.lock().unwrap();
    store.queries.push(query.clone());
    let query = query.unwrap_or_default();
    let search = query_value(&query, "search");
    let favorite = query_value(&query, "isFavorite").map(|v| v == "true");
    let tasks: Vec<&Task> = store
        .tasks
        .iter()
        .filter(|t| search.as_ref().map_or(true, |s| t.title.contains(s.as_str())))
        .filter(|t| favorite.map_or(true, |f| t.is_favorite == f))
        .collect();
    Json(json!({ "tasks": tasks, "total": tasks.len() }))
}

async fn create(State(store): State<Shared>, Json(body): Json<Value>) -> Result<(StatusCode, Json<Task>), ApiError> {
    let title = body["title"].as_str().unwrap_or_default().trim().to_string();
    if title.is_empty() {
        return Err(bad_request("Title is required"));
    }
    let color = match body.get("color") {
        Some(c) => serde_json::from_value(c.clone()).map_err(|_| bad_request("Invalid color"))?,
        None => TaskColor::Gray,
    };
    let mut store = store.lock().unwrap();
    store.next_id += 1;
    let now = Utc::now();
    let task = Task {
        id: format!("task-{}", store.next_id),
        title,
        description: body["description"].as_str().map(str::to_string),
        status: TaskStatus::Pending,
        is_favorite: false,
        color,
        created_at: now,
        updated_at: now,
    };
    store.tasks.push(task.clone());
    Ok((StatusCode::CREATED, Json(task)))
}

async fn fetch(State(store): State<Shared>, Path(id): Path<String>) -> Result<Json<Task>, ApiError> {
    let store = store.lock().unwrap();
    store
        .tasks
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn update(
    State(store): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Task>, ApiError> {
    let mut store = store.lock().unwrap();
    store.patches.push(body.clone());
    let task = store.tasks.iter_mut().find(|t| t.id == id).ok_or_else(|| not_found(&id))?;
    if let Some(title) = body["title"].as_str() {
        task.title = title.to_string();
    }
    if let Some(description) = body["description"].as_str() {
        task.description = Some(description.to_string());
    }
    if let Some(favorite) = body["isFavorite"].as_bool() {
        task.is_favorite = favorite;
    }
    if let Some(status) = body.get("status") {
        task.status = serde_json::from_value(status.clone()).map_err(|_| bad_request("Invalid status"))?;
    }
    if let Some(color) = body.get("color") {
        task.color = serde_json::from_value(color.clone()).map_err(|_| bad_request("Invalid color"))?;
    }
    task.updated_at = Utc::now();
    Ok(Json(task.clone()))
}

async fn remove(State(store): State<Shared>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let mut store = store.lock().unwrap();
    let before = store.tasks.len();
    store.tasks.retain(|t| t.id != id);
    if store.tasks.len() == before {
        return Err(not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "tasks": [] }))
}

async fn spawn_server() -> (String, Shared) {
    let store: Shared = Arc::default();
    let app = Router::new()
        .route("/api/v1/tasks", get(list).post(create))
        .route("/api/v1/tasks/{id}", get(fetch).patch(update).delete(remove))
        .route("/slow/api/v1/tasks", get(slow))
        .with_state(Arc::clone(&store));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), store)
}

fn service(origin: &str) -> HttpTaskService {
    HttpTaskService::new(&format!("{origin}/api/v1"), Duration::from_millis(10_000)).unwrap()
}

#[tokio::test]
async fn created_task_round_trips_with_defaults() {
    let (origin, _) = spawn_server().await;
    let api = service(&origin);

    let mut input = NewTask::titled("Buy milk");
    input.color = Some(TaskColor::Blue);
    let created = api.create(&input).await.unwrap();

    let fetched = api.get(&created.id).await.unwrap();
    assert_eq!(fetched.title, "Buy milk");
    assert_eq!(fetched.status, TaskStatus::Pending);
    assert!(!fetched.is_favorite);
    assert_eq!(fetched.color, TaskColor::Blue);
    assert_eq!(fetched.created_at, created.created_at);
}

#[tokio::test]
async fn cleared_search_is_not_sent() {
    let (origin, store) = spawn_server().await;
    let api = service(&origin);
    api.create(&NewTask::titled("Buy milk")).await.unwrap();
    api.create(&NewTask::titled("Pay rent")).await.unwrap();

    let milk = TaskFilters {
        search: Some("milk".into()),
        ..Default::default()
    };
    assert_eq!(api.list(&milk).await.unwrap().len(), 1);

    let cleared = TaskFilters {
        search: Some(String::new()),
        ..Default::default()
    };
    assert_eq!(api.list(&cleared).await.unwrap().len(), 2);

    let favorites = TaskFilters {
        is_favorite: Some(true),
        ..Default::default()
    };
    assert!(api.list(&favorites).await.unwrap().is_empty());

    let queries = store.lock().unwrap().queries.clone();
    assert_eq!(
        queries,
        vec![Some("search=milk".to_string()), None, Some("isFavorite=true".to_string())]
    );
}

#[tokio::test]
async fn update_sends_only_changed_fields() {
    let (origin, store) = spawn_server().await;
    let api = service(&origin);
    let created = api.create(&NewTask::titled("Buy milk")).await.unwrap();

    let updated = api.set_favorite(&created.id, true).await.unwrap();
    assert!(updated.is_favorite);
    let done = api.toggle_completion(&created.id, updated.status).await.unwrap();
    assert_eq!(done.status, TaskStatus::Completed);

    let patches = store.lock().unwrap().patches.clone();
    assert_eq!(patches, vec![json!({ "isFavorite": true }), json!({ "status": "completed" })]);
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let (origin, _) = spawn_server().await;
    let api = service(&origin);
    let created = api.create(&NewTask::titled("Buy milk")).await.unwrap();

    api.delete(&created.id).await.unwrap();
    assert!(api.delete(&created.id).await.unwrap_err().is_not_found());
    assert!(api.get(&created.id).await.unwrap_err().is_not_found());
    assert!(api
        .update("nope", &TaskPatch::favorite(true))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn server_error_payload_is_surfaced() {
    let (origin, _) = spawn_server().await;
    let err = service(&origin).create(&NewTask::titled("")).await.unwrap_err();
    match err {
        ServiceError::Server { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Title is required");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_requests_time_out() {
    let (origin, _) = spawn_server().await;
    let api = HttpTaskService::new(&format!("{origin}/slow/api/v1"), Duration::from_millis(200)).unwrap();
    let err = api.list(&TaskFilters::default()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Timeout { after_ms: 200 }), "{err:?}");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = service(&format!("http://{addr}")).list(&TaskFilters::default()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn controller_keeps_confirmed_state() {
    let (origin, _) = spawn_server().await;
    let mut controller = Controller::new(Arc::new(service(&origin)));
    controller.reload();
    assert_eq!(controller.settle().await, Some(Settled::Loaded { count: 0 }));

    controller.create(NewTask::titled("Buy milk"));
    let Some(Settled::Created { id }) = controller.settle().await else {
        panic!("create did not settle");
    };
    controller.toggle_favorite(&id);
    controller.settle().await;
    assert_eq!(controller.partitions().favorites.len(), 1);

    controller.delete("missing");
    let settled = controller.settle().await.unwrap();
    assert!(settled.is_failure());
    assert_eq!(controller.state().tasks.len(), 1);

    controller.delete(&id);
    controller.settle().await;
    assert!(controller.state().tasks.is_empty());
}
