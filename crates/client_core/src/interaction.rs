//! Capabilities the screens borrow from their host: modal dialogs, string
//! lookup and page navigation.

use std::collections::HashMap;

use async_trait::async_trait;
use shared::domain::GuestRequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Ok,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogButton {
    pub result: DialogOutcome,
    pub label: String,
    pub primary: bool,
}

impl DialogButton {
    pub fn ok(translate: &dyn Translate) -> Self {
        Self {
            result: DialogOutcome::Ok,
            label: translate.instant("ok"),
            primary: true,
        }
    }

    pub fn cancel(translate: &dyn Translate) -> Self {
        Self {
            result: DialogOutcome::Cancel,
            label: translate.instant("cancel"),
            primary: false,
        }
    }
}

/// Shows a modal and resolves once it is closed. Closing without picking a
/// button counts as `Cancel`.
#[async_trait]
pub trait Dialogs: Send + Sync {
    async fn message_box(
        &self,
        title: &str,
        message: &str,
        buttons: &[DialogButton],
    ) -> DialogOutcome;
}

pub trait Translate: Send + Sync {
    fn instant(&self, key: &str) -> String;
}

pub trait Navigator: Send + Sync {
    /// Full reload of the current page.
    fn reload(&self);
    fn open_guest_request_judge(&self, id: GuestRequestId);
}

const ENGLISH: &[(&str, &str)] = &[
    ("ok", "OK"),
    ("cancel", "Cancel"),
    ("chat.delete_message_title", "Delete message"),
    (
        "chat.delete_message_message",
        "Do you really want to delete this message?",
    ),
    ("chat.error.send", "The message could not be sent"),
    ("chat.error.delete", "The message could not be deleted"),
    ("guestrequest.request_success_title", "Request sent"),
    (
        "guestrequest.request_success_message",
        "Your request has been sent. An administrator will review it shortly.",
    ),
    ("guestrequest.error.title", "Request failed"),
    (
        "guestrequest.error.unknown",
        "An unknown error occurred while sending your request",
    ),
    (
        "settings.guestrequest.judge.request_success_title",
        "Request processed",
    ),
    (
        "settings.guestrequest.judge.request_success_message",
        "The guest request has been processed.",
    ),
    (
        "settings.guestrequest.judge.request_not_found_title",
        "Request not found",
    ),
    (
        "settings.guestrequest.judge.request_not_found_message",
        "This guest request no longer exists.",
    ),
    (
        "settings.guestrequest.judge.error_unknown",
        "The request could not be processed",
    ),
];

/// In-memory string table. Unknown keys translate to themselves.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    pub fn english() -> Self {
        Self {
            entries: ENGLISH
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }
}

impl Translate for Catalog {
    fn instant(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
