use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use server_api::{
    add_chat_message, authenticate, create_user, delete_chat_message, delete_guest_request,
    judge_guest_request, list_chat_messages, list_guest_requests, login, session::SessionConfig,
    submit_guest_request, view_guest_request, ApiContext, Principal,
};
use shared::{
    domain::Role,
    error::{ApiError, ErrorCode},
    protocol::{
        ChatMessageList, ChatMessagePayload, GuestRequestDetail, GuestRequestList,
        GuestRequestListQuery, GuestRequestSubmission, JudgeRequest, LoginRequest, LoginResponse,
        NewChatMessage, StatusResponse,
    },
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

mod app_state;
mod config;
mod extract;

use app_state::AppState;
use config::{load_settings, prepare_database_url, Settings};
use extract::{ApiJson, ApiQuery};

type ApiReply<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Default, Deserialize)]
struct ListGuestRequestsParams {
    sort_column: Option<u8>,
    asc: Option<bool>,
}

impl ListGuestRequestsParams {
    fn into_query(self) -> GuestRequestListQuery {
        let defaults = GuestRequestListQuery::default();
        GuestRequestListQuery {
            sort_column: self.sort_column.unwrap_or(defaults.sort_column),
            asc: self.asc.unwrap_or(defaults.asc),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    ensure_bootstrap_admin(&storage, &settings).await?;

    let api = ApiContext {
        storage,
        session: SessionConfig {
            secret: settings.auth_secret.clone(),
            ttl_seconds: settings.session_ttl_seconds,
        },
    };
    let state = AppState {
        api,
        max_body_bytes: settings.max_body_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;
    Ok(())
}

async fn ensure_bootstrap_admin(storage: &Storage, settings: &Settings) -> anyhow::Result<()> {
    let Some(password) = settings.bootstrap_admin_password.as_deref() else {
        return Ok(());
    };
    if storage
        .user_by_username(&settings.bootstrap_admin_username)
        .await?
        .is_some()
    {
        return Ok(());
    }
    create_user(
        storage,
        &settings.bootstrap_admin_username,
        &settings.bootstrap_admin_email,
        password,
        Role::Admin,
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to create bootstrap admin: {}", e.message))?;
    info!(username = %settings.bootstrap_admin_username, "bootstrap admin created");
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/user/login", post(http_login))
        .route(
            "/chat_message",
            get(http_list_chat_messages).put(http_add_chat_message),
        )
        .route(
            "/chat_message/:id",
            axum::routing::delete(http_delete_chat_message),
        )
        .route("/guest_request", put(http_submit_guest_request))
        .route("/guest_request/list", get(http_list_guest_requests))
        .route(
            "/guest_request/:id",
            get(http_view_guest_request)
                .post(http_judge_guest_request)
                .delete(http_delete_guest_request),
        )
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            warn!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn http_login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiReply<LoginResponse> {
    let response = login(&state.api, &req.username, &req.password)
        .await
        .map_err(reject)?;
    Ok(Json(response))
}

async fn http_list_chat_messages(State(state): State<Arc<AppState>>) -> ApiReply<ChatMessageList> {
    let list = list_chat_messages(&state.api).await.map_err(reject)?;
    Ok(Json(list))
}

async fn http_add_chat_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<NewChatMessage>,
) -> ApiReply<ChatMessagePayload> {
    let principal = principal(&state, &headers).await?;
    let message = add_chat_message(&state.api, &principal, &req.content)
        .await
        .map_err(reject)?;
    Ok(Json(message))
}

async fn http_delete_chat_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiReply<StatusResponse> {
    let principal = principal(&state, &headers).await?;
    let status = delete_chat_message(&state.api, &principal, &id)
        .await
        .map_err(reject)?;
    Ok(Json(status))
}

async fn http_submit_guest_request(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GuestRequestSubmission>,
) -> ApiReply<StatusResponse> {
    let status = submit_guest_request(&state.api, &req)
        .await
        .map_err(reject)?;
    Ok(Json(status))
}

async fn http_list_guest_requests(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListGuestRequestsParams>,
    headers: HeaderMap,
) -> ApiReply<GuestRequestList> {
    let principal = principal(&state, &headers).await?;
    let list = list_guest_requests(&state.api, &principal, params.into_query())
        .await
        .map_err(reject)?;
    Ok(Json(list))
}

async fn http_view_guest_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiReply<GuestRequestDetail> {
    let principal = principal(&state, &headers).await?;
    let detail = view_guest_request(&state.api, &principal, &id)
        .await
        .map_err(reject)?;
    Ok(Json(detail))
}

async fn http_judge_guest_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<JudgeRequest>,
) -> ApiReply<StatusResponse> {
    let principal = principal(&state, &headers).await?;
    let status = judge_guest_request(&state.api, &principal, &id, req.approved)
        .await
        .map_err(reject)?;
    Ok(Json(status))
}

async fn http_delete_guest_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiReply<StatusResponse> {
    let principal = principal(&state, &headers).await?;
    let status = delete_guest_request(&state.api, &principal, &id)
        .await
        .map_err(reject)?;
    Ok(Json(status))
}

async fn principal(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, (StatusCode, Json<ApiError>)> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    authenticate(&state.api, token).await.map_err(reject)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::Validation | ErrorCode::RequestAlreadyProcessed => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound | ErrorCode::RequestNotFound => StatusCode::NOT_FOUND,
        ErrorCode::AlreadyExistingUsername => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(err.code);
    if status.is_server_error() {
        error!(code = %err.code, message = %err.message, "request failed");
    }
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
