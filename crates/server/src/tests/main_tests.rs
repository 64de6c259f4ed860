use super::*;
use axum::{body, body::Body, http::Request, response::Response};
use tower::ServiceExt;

async fn test_app() -> (Router, Storage) {
    test_app_at("sqlite::memory:").await
}

async fn test_app_at(database_url: &str) -> (Router, Storage) {
    let storage = Storage::new(database_url).await.expect("db");
    create_user(&storage, "admin", "admin@example.com", "admin-password", Role::Admin)
        .await
        .expect("admin");
    create_user(&storage, "member", "member@example.com", "member-password", Role::User)
        .await
        .expect("member");

    let api = ApiContext {
        storage,
        session: SessionConfig {
            secret: "s".to_string(),
            ttl_seconds: 60,
        },
    };
    let app = build_router(Arc::new(AppState {
        api: api.clone(),
        max_body_bytes: 64 * 1024,
    }));
    (app, api.storage)
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

async fn token_for(app: &Router, username: &str, password: &str) -> String {
    let request = Request::post("/user/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "username": username, "password": password }).to_string(),
        ))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    json_body::<LoginResponse>(response).await.token
}

fn authorized(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}

async fn submit_guest(app: &Router, username: &str) -> StatusCode {
    let request = Request::put("/guest_request")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "username": username,
                "password": "guest-password",
                "email": format!("{username}@guest.example"),
                "storage_quota": 10_000_000u64,
            })
            .to_string(),
        ))
        .expect("request");
    app.clone().oneshot(request).await.expect("response").status()
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn login_with_wrong_password_is_forbidden() {
    let (app, _storage) = test_app().await;
    let request = Request::post("/user/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "username": "admin", "password": "wrong-password" }).to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Forbidden);
}

#[tokio::test]
async fn chat_is_readable_anonymously_but_posting_needs_a_session() {
    let (app, _storage) = test_app().await;
    let request = Request::get("/chat_message")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let listed: ChatMessageList = json_body(response).await;
    assert!(listed.chat_messages.is_empty());

    let request = Request::put("/chat_message")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "content": "hi" }).to_string()))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = json_body(response).await;
    assert_eq!(body["type"], "ForbiddenError");
}

#[tokio::test]
async fn chat_message_add_list_delete_round() {
    let (app, _storage) = test_app().await;
    let token = token_for(&app, "member", "member-password").await;

    let add = authorized(
        "PUT",
        "/chat_message",
        &token,
        Some(serde_json::json!({ "content": "hello" })),
    );
    let response = app.clone().oneshot(add).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let created: ChatMessagePayload = json_body(response).await;
    assert_eq!(created.content, "hello");
    assert_eq!(created.creator.as_deref(), Some("member"));

    let list = authorized("GET", "/chat_message", &token, None);
    let response = app.clone().oneshot(list).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let listed: ChatMessageList = json_body(response).await;
    assert_eq!(listed.chat_messages, vec![created.clone()]);

    let delete = authorized("DELETE", &format!("/chat_message/{}", created.id), &token, None);
    let response = app.clone().oneshot(delete).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let delete_again = authorized("DELETE", &format!("/chat_message/{}", created.id), &token, None);
    let response = app.oneshot(delete_again).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_chat_message_is_a_validation_error() {
    let (app, _storage) = test_app().await;
    let token = token_for(&app, "member", "member-password").await;
    let add = authorized(
        "PUT",
        "/chat_message",
        &token,
        Some(serde_json::json!({ "content": "   " })),
    );
    let response = app.oneshot(add).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn anonymous_guest_request_then_duplicate_conflicts() {
    let (app, _storage) = test_app().await;
    assert_eq!(submit_guest(&app, "visitor").await, StatusCode::OK);
    assert_eq!(submit_guest(&app, "visitor").await, StatusCode::CONFLICT);
    assert_eq!(submit_guest(&app, "member").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn guest_request_list_honours_sort_parameters() {
    let (app, _storage) = test_app().await;
    for name in ["bravo", "alpha", "charlie"] {
        assert_eq!(submit_guest(&app, name).await, StatusCode::OK);
    }
    let token = token_for(&app, "admin", "admin-password").await;

    let list = authorized("GET", "/guest_request/list", &token, None);
    let response = app.clone().oneshot(list).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let listed: GuestRequestList = json_body(response).await;
    let names: Vec<_> = listed.guest_requests.iter().map(|r| r.username.as_str()).collect();
    assert_eq!(names, ["alpha", "bravo", "charlie"]);

    let list = authorized("GET", "/guest_request/list?sort_column=1&asc=false", &token, None);
    let response = app.oneshot(list).await.expect("response");
    let listed: GuestRequestList = json_body(response).await;
    let names: Vec<_> = listed.guest_requests.iter().map(|r| r.username.as_str()).collect();
    assert_eq!(names, ["charlie", "bravo", "alpha"]);
}

#[tokio::test]
async fn judging_unknown_request_reports_request_not_found() {
    let (app, _storage) = test_app().await;
    let token = token_for(&app, "admin", "admin-password").await;
    let judge = authorized(
        "POST",
        &format!("/guest_request/{}", shared::domain::GuestRequestId::generate()),
        &token,
        Some(serde_json::json!({ "approved": true })),
    );
    let response = app.oneshot(judge).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = json_body(response).await;
    assert_eq!(body["type"], "RequestNotFound");
}

#[tokio::test]
async fn members_cannot_judge_but_admins_can() {
    let (app, storage) = test_app().await;
    assert_eq!(submit_guest(&app, "visitor").await, StatusCode::OK);
    let request_id = storage
        .list_guest_requests(shared::protocol::GuestRequestSortColumn::Username, true)
        .await
        .expect("list")
        .into_iter()
        .find(|r| r.username == "visitor")
        .expect("pending request")
        .request_id;

    let member = token_for(&app, "member", "member-password").await;
    let judge = authorized(
        "POST",
        &format!("/guest_request/{request_id}"),
        &member,
        Some(serde_json::json!({ "approved": true })),
    );
    let response = app.clone().oneshot(judge).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = token_for(&app, "admin", "admin-password").await;
    let judge = authorized(
        "POST",
        &format!("/guest_request/{request_id}"),
        &admin,
        Some(serde_json::json!({ "approved": true })),
    );
    let response = app.clone().oneshot(judge).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let view = authorized("GET", &format!("/guest_request/{request_id}"), &admin, None);
    let response = app.clone().oneshot(view).await.expect("response");
    let detail: GuestRequestDetail = json_body(response).await;
    assert_eq!(detail.approved, shared::domain::ApprovalState::Approved);

    token_for(&app, "visitor", "guest-password").await;
}

#[tokio::test]
async fn bootstrap_admin_is_created_once_when_password_is_configured() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let settings = Settings {
        bootstrap_admin_username: "root".into(),
        bootstrap_admin_password: Some("root-password".into()),
        bootstrap_admin_email: "root@example.com".into(),
        ..Settings::default()
    };
    ensure_bootstrap_admin(&storage, &settings).await.expect("first");
    ensure_bootstrap_admin(&storage, &settings).await.expect("second");

    let user = storage
        .user_by_username("root")
        .await
        .expect("lookup")
        .expect("created");
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn malformed_json_body_is_a_validation_error() {
    let (app, _storage) = test_app().await;
    let request = Request::put("/guest_request")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"username": "visitor""#))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Validation);

    let request = Request::put("/guest_request")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"username": "visitor"}"#))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn unparsable_list_query_is_a_validation_error() {
    let (app, _storage) = test_app().await;
    let token = token_for(&app, "admin", "admin-password").await;
    let list = authorized("GET", "/guest_request/list?sort_column=name", &token, None);
    let response = app.oneshot(list).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn simultaneous_submissions_and_judgements_on_a_file_database() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("server.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    let (app, storage) = test_app_at(&database_url).await;

    let (first, second) = tokio::join!(submit_guest(&app, "alpha"), submit_guest(&app, "bravo"));
    assert_eq!((first, second), (StatusCode::OK, StatusCode::OK));

    let request_id = storage
        .list_guest_requests(shared::protocol::GuestRequestSortColumn::Username, true)
        .await
        .expect("list")
        .into_iter()
        .find(|r| r.username == "alpha")
        .expect("pending request")
        .request_id;
    let admin = token_for(&app, "admin", "admin-password").await;
    let judge = || {
        authorized(
            "POST",
            &format!("/guest_request/{request_id}"),
            &admin,
            Some(serde_json::json!({ "approved": true })),
        )
    };
    let (a, b) = tokio::join!(app.clone().oneshot(judge()), app.clone().oneshot(judge()));
    let mut statuses = [a.expect("response").status(), b.expect("response").status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
}
