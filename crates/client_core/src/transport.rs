use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ChatMessageId, GuestRequestId},
    error::ApiError,
    protocol::{
        ChatMessageList, ChatMessagePayload, GuestRequestDetail, GuestRequestList,
        GuestRequestListQuery, GuestRequestSubmission, JudgeRequest, LoginRequest, LoginResponse,
        NewChatMessage, CHAT_MESSAGE_ROUTE, GUEST_REQUEST_LIST_ROUTE, GUEST_REQUEST_ROUTE,
        LOGIN_ROUTE,
    },
};
use tracing::debug;
use url::Url;

use crate::{config::ClientConfig, error::ClientError};

/// The remote resources the screens talk to.
#[async_trait]
pub trait DocsBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError>;
    async fn list_chat_messages(&self) -> Result<ChatMessageList, ClientError>;
    async fn add_chat_message(&self, content: &str) -> Result<ChatMessagePayload, ClientError>;
    async fn delete_chat_message(&self, id: ChatMessageId) -> Result<(), ClientError>;
    async fn submit_guest_request(
        &self,
        submission: &GuestRequestSubmission,
    ) -> Result<(), ClientError>;
    async fn list_guest_requests(
        &self,
        query: GuestRequestListQuery,
    ) -> Result<GuestRequestList, ClientError>;
    async fn guest_request(&self, id: GuestRequestId) -> Result<GuestRequestDetail, ClientError>;
    async fn judge_guest_request(
        &self,
        id: GuestRequestId,
        approved: bool,
    ) -> Result<(), ClientError>;
}

/// `DocsBackend` over HTTP. Non-2xx responses carrying an `ApiError` body
/// surface as `ClientError::Api`.
pub struct HttpBackend {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base = Url::parse(&format!("{}/", config.server_url.trim_end_matches('/')))?;
        Ok(Self {
            http: Client::new(),
            base,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        debug!(url = %response.url(), %status, "backend response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await?;
        Err(match serde_json::from_slice::<ApiError>(&body) {
            Ok(error) => ClientError::Api {
                status: status.as_u16(),
                error,
            },
            Err(_) => ClientError::Status(status.as_u16()),
        })
    }

    async fn read<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let body = self.send(builder).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl DocsBackend for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = self.http.post(self.url(LOGIN_ROUTE)?).json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        });
        self.read(request).await
    }

    async fn list_chat_messages(&self) -> Result<ChatMessageList, ClientError> {
        self.read(self.http.get(self.url(CHAT_MESSAGE_ROUTE)?))
            .await
    }

    async fn add_chat_message(&self, content: &str) -> Result<ChatMessagePayload, ClientError> {
        let request = self
            .http
            .put(self.url(CHAT_MESSAGE_ROUTE)?)
            .json(&NewChatMessage {
                content: content.to_string(),
            });
        self.read(request).await
    }

    async fn delete_chat_message(&self, id: ChatMessageId) -> Result<(), ClientError> {
        let url = self.url(&format!("{CHAT_MESSAGE_ROUTE}/{id}"))?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn submit_guest_request(
        &self,
        submission: &GuestRequestSubmission,
    ) -> Result<(), ClientError> {
        let request = self
            .http
            .put(self.url(GUEST_REQUEST_ROUTE)?)
            .json(submission);
        self.send(request).await?;
        Ok(())
    }

    async fn list_guest_requests(
        &self,
        query: GuestRequestListQuery,
    ) -> Result<GuestRequestList, ClientError> {
        let request = self
            .http
            .get(self.url(GUEST_REQUEST_LIST_ROUTE)?)
            .query(&[
                ("sort_column", query.sort_column.to_string()),
                ("asc", query.asc.to_string()),
            ]);
        self.read(request).await
    }

    async fn guest_request(&self, id: GuestRequestId) -> Result<GuestRequestDetail, ClientError> {
        let url = self.url(&format!("{GUEST_REQUEST_ROUTE}/{id}"))?;
        self.read(self.http.get(url)).await
    }

    async fn judge_guest_request(
        &self,
        id: GuestRequestId,
        approved: bool,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("{GUEST_REQUEST_ROUTE}/{id}"))?;
        self.send(self.http.post(url).json(&JudgeRequest { approved }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
