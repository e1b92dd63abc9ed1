use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app_with_state, List, MockState, Task, EMAIL, PASSWORD};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(state: &MockState, method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, format!("Bearer {}", state.token()))
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn login_returns_token() {
    let state = MockState::new();
    let resp = app_with_state(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(json!({"email": EMAIL, "password": PASSWORD}).to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["token"], state.token());
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let resp = app_with_state(MockState::new())
        .oneshot(Request::builder().uri("/me/tasks").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- lists and tasks ---

#[tokio::test]
async fn create_list_then_task() {
    let state = MockState::new();
    let app = app_with_state(state.clone());

    let resp = app
        .clone()
        .oneshot(authed(&state, "POST", "/me/lists", r#"{"title":"Groceries"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let list: List = body_json(resp).await;
    assert_eq!(list.title, "Groceries");

    let body = json!({"list_id": list.id, "title": "Milk", "starred": 1}).to_string();
    let resp = app
        .clone()
        .oneshot(authed(&state, "POST", "/me/tasks", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Task = body_json(resp).await;
    assert_eq!(task.list_id, list.id);
    assert_eq!(task.starred, 1);
    assert!(task.completed_at.is_none());

    assert_eq!(state.tasks().await.len(), 1);
    assert_eq!(state.lists().await.len(), 1);
}

#[tokio::test]
async fn create_task_in_unknown_list_returns_422() {
    let state = MockState::new();
    let resp = app_with_state(state.clone())
        .oneshot(authed(
            &state,
            "POST",
            "/me/tasks",
            r#"{"list_id":"nowhere","title":"Milk"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn update_and_delete_task() {
    let state = MockState::new();
    let app = app_with_state(state.clone());

    let resp = app
        .clone()
        .oneshot(authed(
            &state,
            "POST",
            "/me/tasks",
            r#"{"list_id":"inbox","title":"Call"}"#,
        ))
        .await
        .unwrap();
    let task: Task = body_json(resp).await;

    let resp = app
        .clone()
        .oneshot(authed(
            &state,
            "PUT",
            &format!("/{}", task.id),
            r#"{"completed_at":"2024-01-02T00:00:00Z","position":0}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = body_json(resp).await;
    assert_eq!(updated.completed_at.as_deref(), Some("2024-01-02T00:00:00Z"));
    assert_eq!(updated.title, "Call");

    let resp = app
        .clone()
        .oneshot(authed(
            &state,
            "DELETE",
            &format!("/{}", task.id),
            r#"{"deleted_at":"2024-01-03T00:00:00Z"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = app
        .oneshot(authed(&state, "DELETE", &format!("/{}", task.id), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- batch ---

#[tokio::test]
async fn batch_returns_results_in_order() {
    let state = MockState::new();
    let body = json!({"sequential": true, "ops": [
        {"method": "POST", "url": "/me/lists", "params": {"title": "Work"}},
        {"method": "GET", "url": "/me/tasks", "params": {}},
        {"method": "GET", "url": "/me/lists", "params": {}},
    ]})
    .to_string();
    let resp = app_with_state(state.clone())
        .oneshot(authed(&state, "POST", "/batch", &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let reply: Value = body_json(resp).await;
    let results = reply["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["status"], 201);
    assert_eq!(results[1]["body"], json!([]));
    assert_eq!(results[2]["body"][0]["title"], "Work");
}

#[tokio::test]
async fn injected_fault_hits_next_matching_request() {
    let state = MockState::new();
    state
        .fail_next(http::Method::GET, "/me/lists", StatusCode::NOT_FOUND)
        .await;
    let app = app_with_state(state.clone());

    let resp = app
        .clone()
        .oneshot(authed(&state, "GET", "/me/lists", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .oneshot(authed(&state, "GET", "/me/lists", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- comments ---

#[tokio::test]
async fn comments_round_trip() {
    let state = MockState::new();
    let app = app_with_state(state.clone());
    let resp = app
        .clone()
        .oneshot(authed(
            &state,
            "POST",
            "/me/tasks",
            r#"{"list_id":"inbox","title":"Call"}"#,
        ))
        .await
        .unwrap();
    let task: Task = body_json(resp).await;

    let body = json!({"channel_id": task.id, "channel_type": "tasks", "text": "soon"}).to_string();
    let uri = format!("/tasks/{}/messages", task.id);
    let resp = app
        .clone()
        .oneshot(authed(&state, "POST", &uri, &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app.oneshot(authed(&state, "GET", &uri, "")).await.unwrap();
    let comments: Vec<Value> = body_json(resp).await;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "soon");
}
