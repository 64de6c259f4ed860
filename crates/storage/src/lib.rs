use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, SqliteConnection, Transaction,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use uuid::Uuid;

use shared::{
    domain::{ApprovalState, ChatMessageId, GuestRequestId, Role, UserId},
    protocol::GuestRequestSortColumn,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub storage_quota: u64,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub storage_quota: u64,
}

#[derive(Debug, Clone)]
pub struct StoredChatMessage {
    pub message_id: ChatMessageId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: i64,
    pub creator_username: String,
    pub creator_email: String,
}

#[derive(Debug, Clone)]
pub struct NewGuestRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub storage_quota: u64,
}

#[derive(Debug, Clone)]
pub struct StoredGuestRequest {
    pub request_id: GuestRequestId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub storage_quota: u64,
    pub created_at: i64,
    pub approval: ApprovalState,
    pub deleted: bool,
}

/// Result of an insert guarded by username uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    Inserted(T),
    UsernameTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeOutcome {
    Rejected,
    Approved { user_id: UserId },
    NotFound,
    AlreadyProcessed,
    UsernameTaken,
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CHAT_MESSAGE_COLUMNS: &str = "m.id, m.user_id, m.content, m.created_at, u.username, u.email";
const GUEST_REQUEST_COLUMNS: &str =
    "id, username, email, password_hash, storage_quota, created_at, approval, deleted_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, role, storage_quota, created_at";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Takes the write lock at BEGIN so concurrent writers wait on the busy timeout.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("failed to start write transaction")
    }

    pub async fn create_user(&self, user: NewUser<'_>) -> Result<InsertOutcome<UserId>> {
        let mut tx = self.begin_write().await?;
        if username_in_use(&mut tx, user.username, false).await? {
            return Ok(InsertOutcome::UsernameTaken);
        }
        let user_id = insert_user(&mut tx, &user).await?;
        tx.commit().await?;
        Ok(InsertOutcome::Inserted(user_id))
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? AND deleted_at IS NULL"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    pub async fn user_by_id(&self, user_id: UserId) -> Result<Option<StoredUser>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    pub async fn insert_chat_message(
        &self,
        user_id: UserId,
        content: &str,
    ) -> Result<StoredChatMessage> {
        let message_id = ChatMessageId::generate();
        sqlx::query(
            "INSERT INTO chat_messages (id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(message_id.0.to_string())
        .bind(user_id.0.to_string())
        .bind(content)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .context("failed to insert chat message")?;

        self.active_chat_message(message_id)
            .await?
            .context("inserted chat message vanished")
    }

    pub async fn active_chat_message(
        &self,
        message_id: ChatMessageId,
    ) -> Result<Option<StoredChatMessage>> {
        let row = sqlx::query(&format!(
            "SELECT {CHAT_MESSAGE_COLUMNS}
             FROM chat_messages m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.id = ? AND m.deleted_at IS NULL"
        ))
        .bind(message_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(chat_message_from_row).transpose()
    }

    /// Active chat messages, oldest first.
    pub async fn list_active_chat_messages(&self) -> Result<Vec<StoredChatMessage>> {
        let rows = sqlx::query(&format!(
            "SELECT {CHAT_MESSAGE_COLUMNS}
             FROM chat_messages m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.deleted_at IS NULL
             ORDER BY m.created_at ASC, m.rowid ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(chat_message_from_row).collect()
    }

    /// Returns false when the message was missing or already deleted.
    pub async fn soft_delete_chat_message(&self, message_id: ChatMessageId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE chat_messages SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now_millis())
        .bind(message_id.0.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn insert_guest_request(
        &self,
        request: NewGuestRequest<'_>,
    ) -> Result<InsertOutcome<GuestRequestId>> {
        let mut tx = self.begin_write().await?;
        if username_in_use(&mut tx, request.username, true).await? {
            return Ok(InsertOutcome::UsernameTaken);
        }

        let request_id = GuestRequestId::generate();
        sqlx::query(
            "INSERT INTO guest_requests (id, username, password_hash, email, storage_quota, created_at, approval)
             VALUES (?, ?, ?, ?, ?, ?, 'pending')",
        )
        .bind(request_id.0.to_string())
        .bind(request.username)
        .bind(request.password_hash)
        .bind(request.email)
        .bind(quota_to_sql(request.storage_quota))
        .bind(now_millis())
        .execute(&mut *tx)
        .await
        .context("failed to insert guest request")?;
        tx.commit().await?;
        Ok(InsertOutcome::Inserted(request_id))
    }

    pub async fn guest_request(
        &self,
        request_id: GuestRequestId,
    ) -> Result<Option<StoredGuestRequest>> {
        let mut conn = self.pool.acquire().await?;
        guest_request(&mut conn, request_id).await
    }

    /// All guest requests, judged ones included.
    pub async fn list_guest_requests(
        &self,
        column: GuestRequestSortColumn,
        asc: bool,
    ) -> Result<Vec<StoredGuestRequest>> {
        let order_by = match column {
            GuestRequestSortColumn::Id => "id",
            GuestRequestSortColumn::Username => "username",
            GuestRequestSortColumn::Email => "email",
            GuestRequestSortColumn::CreateDate => "created_at",
            GuestRequestSortColumn::Deleted => "deleted_at IS NOT NULL",
            GuestRequestSortColumn::Approved => "approval",
        };
        let direction = if asc { "ASC" } else { "DESC" };
        let rows = sqlx::query(&format!(
            "SELECT {GUEST_REQUEST_COLUMNS} FROM guest_requests
             ORDER BY {order_by} {direction}, rowid {direction}"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(guest_request_from_row).collect()
    }

    /// Approves or rejects a pending request. Approval creates the account
    /// in the same transaction that closes the request.
    pub async fn judge_guest_request(
        &self,
        request_id: GuestRequestId,
        approved: bool,
        judged_by: UserId,
    ) -> Result<JudgeOutcome> {
        let mut tx = self.begin_write().await?;
        let Some(request) = guest_request(&mut tx, request_id).await? else {
            return Ok(JudgeOutcome::NotFound);
        };
        if request.deleted || request.approval.is_judged() {
            return Ok(JudgeOutcome::AlreadyProcessed);
        }

        let outcome = if approved {
            if username_in_use(&mut tx, &request.username, false).await? {
                return Ok(JudgeOutcome::UsernameTaken);
            }
            let user_id = insert_user(
                &mut tx,
                &NewUser {
                    username: &request.username,
                    email: &request.email,
                    password_hash: &request.password_hash,
                    role: Role::User,
                    storage_quota: request.storage_quota,
                },
            )
            .await?;
            JudgeOutcome::Approved { user_id }
        } else {
            JudgeOutcome::Rejected
        };

        let approval = ApprovalState::from_decision(approved);
        sqlx::query(
            "UPDATE guest_requests SET approval = ?, judged_by = ?, deleted_at = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(approval_to_sql(approval))
        .bind(judged_by.0.to_string())
        .bind(now_millis())
        .bind(request_id.0.to_string())
        .execute(&mut *tx)
        .await
        .context("failed to record guest request judgement")?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Closes a request without judging it. Returns false when unknown or already closed.
    pub async fn soft_delete_guest_request(&self, request_id: GuestRequestId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE guest_requests SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now_millis())
        .bind(request_id.0.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

async fn username_in_use(
    conn: &mut SqliteConnection,
    username: &str,
    include_requests: bool,
) -> Result<bool> {
    let users: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? AND deleted_at IS NULL")
            .bind(username)
            .fetch_one(&mut *conn)
            .await?;
    if users > 0 {
        return Ok(true);
    }
    if !include_requests {
        return Ok(false);
    }
    let requests: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM guest_requests WHERE username = ? AND deleted_at IS NULL",
    )
    .bind(username)
    .fetch_one(&mut *conn)
    .await?;
    Ok(requests > 0)
}

async fn insert_user(conn: &mut SqliteConnection, user: &NewUser<'_>) -> Result<UserId> {
    let user_id = UserId::generate();
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role, storage_quota, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id.0.to_string())
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role.as_str())
    .bind(quota_to_sql(user.storage_quota))
    .bind(now_millis())
    .execute(&mut *conn)
    .await
    .context("failed to insert user")?;
    Ok(user_id)
}

async fn guest_request(
    conn: &mut SqliteConnection,
    request_id: GuestRequestId,
) -> Result<Option<StoredGuestRequest>> {
    let row = sqlx::query(&format!(
        "SELECT {GUEST_REQUEST_COLUMNS} FROM guest_requests WHERE id = ?"
    ))
    .bind(request_id.0.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    row.map(guest_request_from_row).transpose()
}

fn user_from_row(row: SqliteRow) -> Result<StoredUser> {
    let role_raw: String = row.try_get(4)?;
    Ok(StoredUser {
        user_id: UserId(parse_uuid(row.try_get(0)?)?),
        username: row.try_get(1)?,
        email: row.try_get(2)?,
        password_hash: row.try_get(3)?,
        role: Role::parse(&role_raw).with_context(|| format!("unknown role '{role_raw}'"))?,
        storage_quota: quota_from_sql(row.try_get(5)?),
        created_at: row.try_get(6)?,
    })
}

fn chat_message_from_row(row: SqliteRow) -> Result<StoredChatMessage> {
    Ok(StoredChatMessage {
        message_id: ChatMessageId(parse_uuid(row.try_get(0)?)?),
        user_id: UserId(parse_uuid(row.try_get(1)?)?),
        content: row.try_get(2)?,
        created_at: row.try_get(3)?,
        creator_username: row.try_get(4)?,
        creator_email: row.try_get(5)?,
    })
}

fn guest_request_from_row(row: SqliteRow) -> Result<StoredGuestRequest> {
    let approval_raw: String = row.try_get(6)?;
    Ok(StoredGuestRequest {
        request_id: GuestRequestId(parse_uuid(row.try_get(0)?)?),
        username: row.try_get(1)?,
        email: row.try_get(2)?,
        password_hash: row.try_get(3)?,
        storage_quota: quota_from_sql(row.try_get(4)?),
        created_at: row.try_get(5)?,
        approval: approval_from_sql(&approval_raw)?,
        deleted: row.try_get::<Option<i64>, _>(7)?.is_some(),
    })
}

fn parse_uuid(raw: String) -> Result<Uuid> {
    Uuid::parse_str(&raw).with_context(|| format!("malformed id '{raw}' in database"))
}

fn approval_to_sql(approval: ApprovalState) -> &'static str {
    match approval {
        ApprovalState::Pending => "pending",
        ApprovalState::Approved => "approved",
        ApprovalState::Rejected => "rejected",
    }
}

fn approval_from_sql(raw: &str) -> Result<ApprovalState> {
    match raw {
        "pending" => Ok(ApprovalState::Pending),
        "approved" => Ok(ApprovalState::Approved),
        "rejected" => Ok(ApprovalState::Rejected),
        other => anyhow::bail!("unknown approval state '{other}'"),
    }
}

fn quota_to_sql(quota: u64) -> i64 {
    i64::try_from(quota).unwrap_or(i64::MAX)
}

fn quota_from_sql(quota: i64) -> u64 {
    u64::try_from(quota).unwrap_or_default()
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
