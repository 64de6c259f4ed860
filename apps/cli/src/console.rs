use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use client_core::{DialogButton, DialogOutcome, Dialogs, Navigator};
use shared::{domain::GuestRequestId, protocol::ChatMessagePayload};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Dialogs on stdout/stdin. With `assume_yes` the primary button is picked
/// without asking.
pub struct ConsoleDialogs {
    pub assume_yes: bool,
}

#[async_trait]
impl Dialogs for ConsoleDialogs {
    async fn message_box(
        &self,
        title: &str,
        message: &str,
        buttons: &[DialogButton],
    ) -> DialogOutcome {
        println!("== {title} ==");
        println!("{message}");
        if buttons.len() <= 1 || self.assume_yes {
            return primary_outcome(buttons);
        }

        let labels: Vec<_> = buttons.iter().map(|b| b.label.as_str()).collect();
        println!("[{}]", labels.join(" / "));
        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        if let Err(error) = stdin.read_line(&mut line).await {
            warn!(%error, "could not read answer; treating as cancel");
            return DialogOutcome::Cancel;
        }
        choose_outcome(&line, buttons)
    }
}

fn primary_outcome(buttons: &[DialogButton]) -> DialogOutcome {
    buttons
        .iter()
        .find(|b| b.primary)
        .or_else(|| buttons.first())
        .map(|b| b.result)
        .unwrap_or(DialogOutcome::Ok)
}

/// Matches the typed answer against button labels, case-insensitively.
/// Anything unrecognised cancels.
pub fn choose_outcome(answer: &str, buttons: &[DialogButton]) -> DialogOutcome {
    let answer = answer.trim();
    buttons
        .iter()
        .find(|b| b.label.eq_ignore_ascii_case(answer))
        .map(|b| b.result)
        .unwrap_or(DialogOutcome::Cancel)
}

/// There is no page to reload on a terminal; the flag lets commands tell the
/// user that the view is stale.
#[derive(Default)]
pub struct ConsoleNavigator {
    reload_requested: AtomicBool,
}

impl ConsoleNavigator {
    pub fn reload_requested(&self) -> bool {
        self.reload_requested.load(Ordering::SeqCst)
    }
}

impl Navigator for ConsoleNavigator {
    fn reload(&self) {
        self.reload_requested.store(true, Ordering::SeqCst);
    }

    fn open_guest_request_judge(&self, id: GuestRequestId) {
        println!("to judge: portal judge {id} --approve | --reject");
    }
}

pub fn format_message(message: &ChatMessagePayload) -> String {
    let when = message
        .create_date
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let who = message.creator.as_deref().unwrap_or("?");
    format!("[{when}] {who}: {} ({})", message.content, message.id)
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
