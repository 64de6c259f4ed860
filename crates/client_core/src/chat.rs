use std::{sync::Arc, time::Duration};

use shared::protocol::ChatMessagePayload;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::ClientError,
    interaction::{DialogButton, DialogOutcome},
    lister::Lister,
    poller::PollHandle,
    ScreenContext, Submission,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted,
    Failed,
}

/// Snapshot of the chat panel for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatView {
    pub messages: Vec<ChatMessagePayload>,
    pub load_error: Option<String>,
    pub action_error: Option<String>,
    pub input: String,
}

#[derive(Default)]
struct ChatModel {
    messages: Lister<ChatMessagePayload>,
    action_error: Option<String>,
    input: String,
}

struct ChatShared {
    ctx: ScreenContext,
    model: Mutex<ChatModel>,
}

impl ChatShared {
    async fn load(&self) {
        let ticket = self.model.lock().await.messages.begin();
        let outcome = match self.ctx.backend.list_chat_messages().await {
            Ok(list) => Ok(list.chat_messages),
            Err(err) => {
                warn!(error = %err, "chat: failed to load messages");
                Err(err.to_string())
            }
        };
        self.model.lock().await.messages.apply(ticket, outcome);
    }

    fn failure_message(&self, err: &ClientError, fallback_key: &str) -> String {
        err.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.ctx.translate.instant(fallback_key))
    }
}

/// Chat panel: message list refreshed on a fixed interval, plus send and
/// confirmed delete. The refresh stops when the screen is closed or dropped.
pub struct ChatScreen {
    shared: Arc<ChatShared>,
    poller: PollHandle,
}

impl ChatScreen {
    pub async fn open(ctx: ScreenContext, poll_interval: Duration) -> Self {
        let shared = Arc::new(ChatShared {
            ctx,
            model: Mutex::new(ChatModel::default()),
        });
        shared.load().await;

        let poll_target = Arc::clone(&shared);
        let poller = PollHandle::spawn(poll_interval, move || {
            let shared = Arc::clone(&poll_target);
            async move { shared.load().await }
        });
        Self { shared, poller }
    }

    pub async fn load(&self) {
        self.shared.load().await;
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.shared.model.lock().await.input = text.into();
    }

    pub async fn send_message(&self) -> Submission {
        let content = self.shared.model.lock().await.input.clone();
        if content.trim().is_empty() {
            return Submission::Skipped;
        }

        match self.shared.ctx.backend.add_chat_message(&content).await {
            Ok(created) => {
                info!(message_id = %created.id, "chat: message sent");
                {
                    let mut model = self.shared.model.lock().await;
                    model.input.clear();
                    model.action_error = None;
                }
                self.shared.load().await;
                Submission::Sent
            }
            Err(err) => {
                warn!(error = %err, "chat: failed to send message");
                let message = self.shared.failure_message(&err, "chat.error.send");
                self.shared.model.lock().await.action_error = Some(message);
                Submission::Failed
            }
        }
    }

    pub async fn delete_message(&self, message: &ChatMessagePayload) -> DeleteOutcome {
        let ctx = &self.shared.ctx;
        let translate = ctx.translate.as_ref();
        let title = translate.instant("chat.delete_message_title");
        let body = translate.instant("chat.delete_message_message");
        let buttons = [DialogButton::cancel(translate), DialogButton::ok(translate)];
        if ctx.dialogs.message_box(&title, &body, &buttons).await != DialogOutcome::Ok {
            return DeleteOutcome::Cancelled;
        }

        match ctx.backend.delete_chat_message(message.id).await {
            Ok(()) => {
                info!(message_id = %message.id, "chat: message deleted");
                self.shared.load().await;
                DeleteOutcome::Deleted
            }
            Err(err) => {
                warn!(message_id = %message.id, error = %err, "chat: failed to delete message");
                let text = self.shared.failure_message(&err, "chat.error.delete");
                self.shared.model.lock().await.action_error = Some(text);
                DeleteOutcome::Failed
            }
        }
    }

    pub async fn view(&self) -> ChatView {
        let model = self.shared.model.lock().await;
        ChatView {
            messages: model.messages.items().to_vec(),
            load_error: model.messages.error().map(str::to_string),
            action_error: model.action_error.clone(),
            input: model.input.clone(),
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    /// Teardown. Safe to call more than once.
    pub fn close(&mut self) {
        if self.poller.cancel() {
            info!("chat: polling stopped");
        }
    }
}

#[cfg(test)]
#[path = "tests/chat_tests.rs"]
mod tests;
