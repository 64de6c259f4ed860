use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::{
    domain::{ApprovalState, ChatMessageId, GuestRequestId},
    error::ApiError,
    protocol::{
        ChatMessageList, ChatMessagePayload, GuestRequestDetail, GuestRequestList,
        GuestRequestListQuery, GuestRequestSubmission, GuestRequestSummary, LoginResponse,
    },
};

use tokio::sync::Notify;

use crate::{
    error::ClientError,
    interaction::{Catalog, DialogButton, DialogOutcome, Dialogs, Navigator},
    transport::DocsBackend,
    ScreenContext,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Login(String),
    ListChat,
    AddChat(String),
    DeleteChat(ChatMessageId),
    SubmitGuest(GuestRequestSubmission),
    ListGuest(GuestRequestListQuery),
    GetGuest(GuestRequestId),
    Judge(GuestRequestId, bool),
}

/// Failure a stub call should produce.
#[derive(Debug, Clone)]
pub(crate) enum Failure {
    Api(u16, ApiError),
    Status(u16),
}

impl Failure {
    fn into_error(self) -> ClientError {
        match self {
            Failure::Api(status, error) => ClientError::Api { status, error },
            Failure::Status(status) => ClientError::Status(status),
        }
    }
}

#[derive(Default)]
pub(crate) struct StubBackend {
    pub calls: Mutex<Vec<Call>>,
    pub chat_messages: Mutex<Vec<ChatMessagePayload>>,
    pub guest_requests: Mutex<Vec<GuestRequestSummary>>,
    pub fail_list_chat: Mutex<Option<Failure>>,
    pub fail_add_chat: Mutex<Option<Failure>>,
    pub fail_delete_chat: Mutex<Option<Failure>>,
    pub fail_submit: Mutex<Option<Failure>>,
    pub fail_get_guest: Mutex<Option<Failure>>,
    pub fail_judge: Mutex<Option<Failure>>,
    /// When set, `judge_guest_request` waits for a notification before answering.
    pub judge_gate: Mutex<Option<Arc<Notify>>>,
}

impl StubBackend {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    pub fn list_chat_calls(&self) -> usize {
        self.count(|call| *call == Call::ListChat)
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls").push(call);
    }

    fn failure(slot: &Mutex<Option<Failure>>) -> Result<(), ClientError> {
        match slot.lock().expect("failure slot").clone() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocsBackend for StubBackend {
    async fn login(&self, username: &str, _password: &str) -> Result<LoginResponse, ClientError> {
        self.record(Call::Login(username.to_string()));
        Ok(LoginResponse {
            token: format!("token-for-{username}"),
        })
    }

    async fn list_chat_messages(&self) -> Result<ChatMessageList, ClientError> {
        self.record(Call::ListChat);
        Self::failure(&self.fail_list_chat)?;
        Ok(ChatMessageList {
            chat_messages: self.chat_messages.lock().expect("messages").clone(),
        })
    }

    async fn add_chat_message(&self, content: &str) -> Result<ChatMessagePayload, ClientError> {
        self.record(Call::AddChat(content.to_string()));
        Self::failure(&self.fail_add_chat)?;
        let message = chat_message(content);
        self.chat_messages
            .lock()
            .expect("messages")
            .push(message.clone());
        Ok(message)
    }

    async fn delete_chat_message(&self, id: ChatMessageId) -> Result<(), ClientError> {
        self.record(Call::DeleteChat(id));
        Self::failure(&self.fail_delete_chat)?;
        self.chat_messages
            .lock()
            .expect("messages")
            .retain(|message| message.id != id);
        Ok(())
    }

    async fn submit_guest_request(
        &self,
        submission: &GuestRequestSubmission,
    ) -> Result<(), ClientError> {
        self.record(Call::SubmitGuest(submission.clone()));
        Self::failure(&self.fail_submit)
    }

    async fn list_guest_requests(
        &self,
        query: GuestRequestListQuery,
    ) -> Result<GuestRequestList, ClientError> {
        self.record(Call::ListGuest(query));
        Ok(GuestRequestList {
            guest_requests: self.guest_requests.lock().expect("requests").clone(),
        })
    }

    async fn guest_request(&self, id: GuestRequestId) -> Result<GuestRequestDetail, ClientError> {
        self.record(Call::GetGuest(id));
        Self::failure(&self.fail_get_guest)?;
        Ok(guest_request(id, "visitor"))
    }

    async fn judge_guest_request(
        &self,
        id: GuestRequestId,
        approved: bool,
    ) -> Result<(), ClientError> {
        self.record(Call::Judge(id, approved));
        let gate = self.judge_gate.lock().expect("gate").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Self::failure(&self.fail_judge)
    }
}

pub(crate) struct ScriptedDialogs {
    pub answer: DialogOutcome,
    pub shown: Mutex<Vec<(String, String, Vec<DialogButton>)>>,
}

impl ScriptedDialogs {
    pub fn answering(answer: DialogOutcome) -> Self {
        Self {
            answer,
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> Vec<(String, String, Vec<DialogButton>)> {
        self.shown.lock().expect("dialogs").clone()
    }
}

#[async_trait]
impl Dialogs for ScriptedDialogs {
    async fn message_box(
        &self,
        title: &str,
        message: &str,
        buttons: &[DialogButton],
    ) -> DialogOutcome {
        self.shown.lock().expect("dialogs").push((
            title.to_string(),
            message.to_string(),
            buttons.to_vec(),
        ));
        self.answer
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    pub reloads: Mutex<usize>,
    pub opened: Mutex<Vec<GuestRequestId>>,
}

impl RecordingNavigator {
    pub fn reloads(&self) -> usize {
        *self.reloads.lock().expect("reloads")
    }
}

impl Navigator for RecordingNavigator {
    fn reload(&self) {
        *self.reloads.lock().expect("reloads") += 1;
    }

    fn open_guest_request_judge(&self, id: GuestRequestId) {
        self.opened.lock().expect("opened").push(id);
    }
}

pub(crate) struct Harness {
    pub backend: Arc<StubBackend>,
    pub dialogs: Arc<ScriptedDialogs>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new(answer: DialogOutcome) -> Self {
        Self {
            backend: Arc::new(StubBackend::default()),
            dialogs: Arc::new(ScriptedDialogs::answering(answer)),
            navigator: Arc::new(RecordingNavigator::default()),
        }
    }

    pub fn ctx(&self) -> ScreenContext {
        ScreenContext {
            backend: self.backend.clone(),
            dialogs: self.dialogs.clone(),
            translate: Arc::new(Catalog::english()),
            navigator: self.navigator.clone(),
        }
    }
}

pub(crate) fn chat_message(content: &str) -> ChatMessagePayload {
    ChatMessagePayload {
        id: ChatMessageId::generate(),
        content: content.to_string(),
        creator: Some("member".to_string()),
        creator_gravatar: None,
        create_date: Some(1_700_000_000_000),
    }
}

pub(crate) fn guest_request(id: GuestRequestId, username: &str) -> GuestRequestSummary {
    GuestRequestSummary {
        id,
        username: username.to_string(),
        email: format!("{username}@guest.example"),
        storage_quota: 5_000_000,
        create_date: 1_700_000_000_000,
        deleted: false,
        approved: ApprovalState::Pending,
    }
}
