use serde::{Deserialize, Serialize};

use crate::domain::{ApprovalState, ChatMessageId, GuestRequestId};

pub const CHAT_MESSAGE_ROUTE: &str = "chat_message";
pub const GUEST_REQUEST_ROUTE: &str = "guest_request";
pub const GUEST_REQUEST_LIST_ROUTE: &str = "guest_request/list";
pub const LOGIN_ROUTE: &str = "user/login";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    pub id: ChatMessageId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_gravatar: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessageList {
    pub chat_messages: Vec<ChatMessagePayload>,
}

/// Body of `PUT guest_request`. `storage_quota` is in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRequestSubmission {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub storage_quota: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRequestSummary {
    pub id: GuestRequestId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub storage_quota: u64,
    pub create_date: i64,
    pub deleted: bool,
    pub approved: ApprovalState,
}

pub type GuestRequestDetail = GuestRequestSummary;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestRequestList {
    pub guest_requests: Vec<GuestRequestSummary>,
}

/// Columns of the guest request list, addressed by index on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuestRequestSortColumn {
    Id,
    #[default]
    Username,
    Email,
    CreateDate,
    Deleted,
    Approved,
}

impl GuestRequestSortColumn {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Id),
            1 => Some(Self::Username),
            2 => Some(Self::Email),
            3 => Some(Self::CreateDate),
            4 => Some(Self::Deleted),
            5 => Some(Self::Approved),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Id => 0,
            Self::Username => 1,
            Self::Email => 2,
            Self::CreateDate => 3,
            Self::Deleted => 4,
            Self::Approved => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRequestListQuery {
    pub sort_column: u8,
    pub asc: bool,
}

impl Default for GuestRequestListQuery {
    fn default() -> Self {
        Self {
            sort_column: GuestRequestSortColumn::default().index(),
            asc: true,
        }
    }
}

impl GuestRequestListQuery {
    pub fn column(&self) -> GuestRequestSortColumn {
        GuestRequestSortColumn::from_index(self.sort_column).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub approved: bool,
}
