use sha2::{Digest, Sha256};
use shared::{
    domain::{ChatMessageId, GuestRequestId, Role, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        ChatMessageList, ChatMessagePayload, GuestRequestDetail, GuestRequestList,
        GuestRequestListQuery, GuestRequestSubmission, GuestRequestSummary, LoginResponse,
        StatusResponse,
    },
};
use storage::{
    InsertOutcome, JudgeOutcome, NewGuestRequest, NewUser, Storage, StoredChatMessage,
    StoredGuestRequest,
};
use tracing::{info, warn};

pub mod session;
pub mod validation;

use session::{hash_password, mint_token, verify_password, verify_token, SessionConfig};
use validation::{validate_email, validate_length, validate_username};

pub const CHAT_MESSAGE_MAX_CHARS: usize = 4000;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub session: SessionConfig,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub async fn login(
    ctx: &ApiContext,
    username: &str,
    password: &str,
) -> Result<LoginResponse, ApiError> {
    let user = ctx
        .storage
        .user_by_username(username.trim())
        .await
        .map_err(internal)?;
    let Some(user) = user.filter(|user| verify_password(password, &user.password_hash)) else {
        warn!(username, "login rejected");
        return Err(ApiError::new(ErrorCode::Forbidden, "Invalid credentials"));
    };
    let token = mint_token(&ctx.session, user.user_id)
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("token mint failed: {e}")))?;
    Ok(LoginResponse { token })
}

/// Resolves a bearer token to an active user.
pub async fn authenticate(ctx: &ApiContext, token: Option<&str>) -> Result<Principal, ApiError> {
    let user_id = token
        .and_then(|token| verify_token(&ctx.session, token))
        .ok_or_else(ApiError::forbidden)?;
    let user = ctx
        .storage
        .user_by_id(user_id)
        .await
        .map_err(internal)?
        .ok_or_else(ApiError::forbidden)?;
    Ok(Principal {
        user_id: user.user_id,
        username: user.username,
        email: user.email,
        role: user.role,
    })
}

/// Open to anonymous callers; only writes need a session.
pub async fn list_chat_messages(ctx: &ApiContext) -> Result<ChatMessageList, ApiError> {
    let messages = ctx
        .storage
        .list_active_chat_messages()
        .await
        .map_err(internal)?;
    Ok(ChatMessageList {
        chat_messages: messages.iter().map(chat_message_payload).collect(),
    })
}

pub async fn add_chat_message(
    ctx: &ApiContext,
    principal: &Principal,
    content: &str,
) -> Result<ChatMessagePayload, ApiError> {
    let content = validate_length(content, "content", 1, CHAT_MESSAGE_MAX_CHARS)?;
    let message = ctx
        .storage
        .insert_chat_message(principal.user_id, &content)
        .await
        .map_err(internal)?;
    info!(message_id = %message.message_id, user = %principal.username, "chat message added");
    Ok(chat_message_payload(&message))
}

pub async fn delete_chat_message(
    ctx: &ApiContext,
    principal: &Principal,
    raw_id: &str,
) -> Result<StatusResponse, ApiError> {
    let not_found = || ApiError::new(ErrorCode::NotFound, "Chat message not found");
    let message_id: ChatMessageId = raw_id.parse().map_err(|_| not_found())?;
    let deleted = ctx
        .storage
        .soft_delete_chat_message(message_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found());
    }
    info!(%message_id, user = %principal.username, "chat message deleted");
    Ok(StatusResponse::ok())
}

/// Anonymous submission of a guest account request.
pub async fn submit_guest_request(
    ctx: &ApiContext,
    submission: &GuestRequestSubmission,
) -> Result<StatusResponse, ApiError> {
    let username = validate_length(&submission.username, "username", 3, 50)?;
    validate_username(&username, "username")?;
    let password = validate_length(&submission.password, "password", 8, 50)?;
    let email = validate_length(&submission.email, "email", 1, 100)?;
    validate_email(&email, "email")?;

    let password_hash = hash_password(&password).map_err(internal)?;
    let outcome = ctx
        .storage
        .insert_guest_request(NewGuestRequest {
            username: &username,
            email: &email,
            password_hash: &password_hash,
            storage_quota: submission.storage_quota,
        })
        .await
        .map_err(internal)?;
    match outcome {
        InsertOutcome::Inserted(request_id) => {
            info!(%request_id, %username, "guest request submitted");
            Ok(StatusResponse::ok())
        }
        InsertOutcome::UsernameTaken => Err(already_existing_username()),
    }
}

pub async fn list_guest_requests(
    ctx: &ApiContext,
    _principal: &Principal,
    query: GuestRequestListQuery,
) -> Result<GuestRequestList, ApiError> {
    let requests = ctx
        .storage
        .list_guest_requests(query.column(), query.asc)
        .await
        .map_err(internal)?;
    Ok(GuestRequestList {
        guest_requests: requests.into_iter().map(guest_request_summary).collect(),
    })
}

pub async fn view_guest_request(
    ctx: &ApiContext,
    _principal: &Principal,
    raw_id: &str,
) -> Result<GuestRequestDetail, ApiError> {
    let request_id = parse_request_id(raw_id)?;
    let request = ctx
        .storage
        .guest_request(request_id)
        .await
        .map_err(internal)?
        .ok_or_else(ApiError::request_not_found)?;
    Ok(guest_request_summary(request))
}

pub async fn judge_guest_request(
    ctx: &ApiContext,
    principal: &Principal,
    raw_id: &str,
    approved: bool,
) -> Result<StatusResponse, ApiError> {
    ensure_admin(principal)?;
    let request_id = parse_request_id(raw_id)?;
    let outcome = ctx
        .storage
        .judge_guest_request(request_id, approved, principal.user_id)
        .await
        .map_err(internal)?;
    match outcome {
        JudgeOutcome::Rejected => {
            info!(%request_id, admin = %principal.username, "guest request rejected");
            Ok(StatusResponse::ok())
        }
        JudgeOutcome::Approved { user_id } => {
            info!(%request_id, %user_id, admin = %principal.username, "guest request approved");
            Ok(StatusResponse::ok())
        }
        JudgeOutcome::NotFound => Err(ApiError::request_not_found()),
        JudgeOutcome::AlreadyProcessed => Err(ApiError::new(
            ErrorCode::RequestAlreadyProcessed,
            "The request has already been processed",
        )),
        JudgeOutcome::UsernameTaken => Err(already_existing_username()),
    }
}

pub async fn delete_guest_request(
    ctx: &ApiContext,
    principal: &Principal,
    raw_id: &str,
) -> Result<StatusResponse, ApiError> {
    ensure_admin(principal)?;
    let request_id = parse_request_id(raw_id)?;
    let deleted = ctx
        .storage
        .soft_delete_guest_request(request_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(ApiError::request_not_found());
    }
    info!(%request_id, admin = %principal.username, "guest request deleted");
    Ok(StatusResponse::ok())
}

/// Creates an account directly, bypassing the guest request workflow.
pub async fn create_user(
    storage: &Storage,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<UserId, ApiError> {
    let username = validate_length(username, "username", 3, 50)?;
    validate_username(&username, "username")?;
    let password = validate_length(password, "password", 8, 50)?;
    let email = validate_length(email, "email", 1, 100)?;
    validate_email(&email, "email")?;
    let password_hash = hash_password(&password).map_err(internal)?;

    match storage
        .create_user(NewUser {
            username: &username,
            email: &email,
            password_hash: &password_hash,
            role,
            storage_quota: 0,
        })
        .await
        .map_err(internal)?
    {
        InsertOutcome::Inserted(user_id) => Ok(user_id),
        InsertOutcome::UsernameTaken => Err(already_existing_username()),
    }
}

pub fn gravatar_hash(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!("{digest:x}")
}

fn chat_message_payload(message: &StoredChatMessage) -> ChatMessagePayload {
    ChatMessagePayload {
        id: message.message_id,
        content: message.content.clone(),
        creator: Some(message.creator_username.clone()),
        creator_gravatar: Some(gravatar_hash(&message.creator_email)),
        create_date: Some(message.created_at),
    }
}

fn guest_request_summary(request: StoredGuestRequest) -> GuestRequestSummary {
    GuestRequestSummary {
        id: request.request_id,
        username: request.username,
        email: request.email,
        storage_quota: request.storage_quota,
        create_date: request.created_at,
        deleted: request.deleted,
        approved: request.approval,
    }
}

fn parse_request_id(raw_id: &str) -> Result<GuestRequestId, ApiError> {
    raw_id.parse().map_err(|_| ApiError::request_not_found())
}

fn ensure_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

fn already_existing_username() -> ApiError {
    ApiError::new(ErrorCode::AlreadyExistingUsername, "Login already used")
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
