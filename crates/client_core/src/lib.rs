use std::sync::Arc;

pub mod chat;
pub mod config;
pub mod error;
pub mod guest_request_form;
pub mod guest_request_judge;
pub mod guest_request_list;
pub mod interaction;
pub mod lister;
pub mod poller;
pub mod transport;

pub use chat::{ChatScreen, ChatView, DeleteOutcome};
pub use config::{ClientConfig, DEFAULT_POLL_INTERVAL};
pub use error::{ClientError, FailureKind};
pub use guest_request_form::{GuestRequestForm, GuestRequestInput};
pub use guest_request_judge::{GuestRequestJudgeScreen, JudgeState};
pub use guest_request_list::GuestRequestListScreen;
pub use interaction::{Catalog, DialogButton, DialogOutcome, Dialogs, Navigator, Translate};
pub use poller::PollHandle;
pub use transport::{DocsBackend, HttpBackend};

/// Collaborators every screen is built from.
#[derive(Clone)]
pub struct ScreenContext {
    pub backend: Arc<dyn DocsBackend>,
    pub dialogs: Arc<dyn Dialogs>,
    pub translate: Arc<dyn Translate>,
    pub navigator: Arc<dyn Navigator>,
}

/// Result of a create/update action started from a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Sent,
    /// Blank input; nothing was sent.
    Skipped,
    Failed,
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
