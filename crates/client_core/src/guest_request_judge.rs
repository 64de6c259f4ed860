use shared::{domain::GuestRequestId, protocol::GuestRequestDetail};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{error::FailureKind, interaction::DialogButton, ScreenContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeState {
    Loading,
    Loaded,
    LoadFailed { message: String },
    /// Set while the decision is in flight; visible through `subscribe`.
    Judging,
    JudgedSuccess,
    JudgedNotFound,
    /// Shown inline; `judge` may be called again.
    JudgeFailed { message: String },
}

impl JudgeState {
    fn accepts_judgement(&self) -> bool {
        matches!(
            self,
            JudgeState::Loaded | JudgeState::LoadFailed { .. } | JudgeState::JudgeFailed { .. }
        )
    }
}

/// Approve/reject screen for a single guest request.
pub struct GuestRequestJudgeScreen {
    ctx: ScreenContext,
    id: GuestRequestId,
    request: Option<GuestRequestDetail>,
    state: watch::Sender<JudgeState>,
}

impl GuestRequestJudgeScreen {
    pub async fn open(ctx: ScreenContext, id: GuestRequestId) -> Self {
        let (state, _) = watch::channel(JudgeState::Loading);
        let mut screen = Self {
            ctx,
            id,
            request: None,
            state,
        };
        match screen.ctx.backend.guest_request(id).await {
            Ok(detail) => {
                screen.request = Some(detail);
                screen.set_state(JudgeState::Loaded);
            }
            Err(err) => {
                warn!(request_id = %id, error = %err, "judge: failed to load request");
                screen.set_state(JudgeState::LoadFailed {
                    message: err.to_string(),
                });
            }
        }
        screen
    }

    pub fn request(&self) -> Option<&GuestRequestDetail> {
        self.request.as_ref()
    }

    pub fn state(&self) -> JudgeState {
        self.state.borrow().clone()
    }

    /// Follows state changes, including `Judging` while `judge` awaits the server.
    pub fn subscribe(&self) -> watch::Receiver<JudgeState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: JudgeState) {
        self.state.send_replace(state);
    }

    pub async fn judge(&mut self, approved: bool) -> JudgeState {
        let current = self.state();
        if !current.accepts_judgement() {
            warn!(request_id = %self.id, state = ?current, "judge: ignored");
            return current;
        }
        self.set_state(JudgeState::Judging);

        let translate = self.ctx.translate.as_ref();
        let ok = [DialogButton::ok(translate)];
        match self.ctx.backend.judge_guest_request(self.id, approved).await {
            Ok(()) => {
                info!(request_id = %self.id, approved, "judge: request processed");
                self.set_state(JudgeState::JudgedSuccess);
                let title = translate.instant("settings.guestrequest.judge.request_success_title");
                let message =
                    translate.instant("settings.guestrequest.judge.request_success_message");
                self.ctx.dialogs.message_box(&title, &message, &ok).await;
                self.ctx.navigator.reload();
            }
            Err(err) if err.kind() == FailureKind::RequestNotFound => {
                info!(request_id = %self.id, "judge: request no longer exists");
                self.set_state(JudgeState::JudgedNotFound);
                let title =
                    translate.instant("settings.guestrequest.judge.request_not_found_title");
                let message =
                    translate.instant("settings.guestrequest.judge.request_not_found_message");
                self.ctx.dialogs.message_box(&title, &message, &ok).await;
            }
            Err(err) => {
                warn!(request_id = %self.id, error = %err, "judge: request failed");
                let message = err.server_message().map(str::to_string).unwrap_or_else(|| {
                    translate.instant("settings.guestrequest.judge.error_unknown")
                });
                self.set_state(JudgeState::JudgeFailed { message });
            }
        }
        self.state()
    }
}

#[cfg(test)]
#[path = "tests/guest_request_judge_tests.rs"]
mod tests;
