use shared::{domain::megabytes_to_bytes, protocol::GuestRequestSubmission};
use tracing::{info, warn};

use crate::{interaction::DialogButton, ScreenContext, Submission};

/// What the visitor typed. The quota is entered in megabytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestRequestInput {
    pub username: String,
    pub password: String,
    pub email: String,
    pub storage_quota_mb: u64,
}

impl GuestRequestInput {
    pub fn to_submission(&self) -> GuestRequestSubmission {
        GuestRequestSubmission {
            username: self.username.clone(),
            password: self.password.clone(),
            email: self.email.clone(),
            storage_quota: megabytes_to_bytes(self.storage_quota_mb),
        }
    }

    fn is_blank(&self) -> bool {
        [&self.username, &self.password, &self.email]
            .iter()
            .any(|field| field.trim().is_empty())
    }
}

/// Anonymous guest account request form.
pub struct GuestRequestForm {
    ctx: ScreenContext,
    pub input: GuestRequestInput,
}

impl GuestRequestForm {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            input: GuestRequestInput::default(),
        }
    }

    /// Sends the request. Success shows a confirmation and reloads the page;
    /// failure shows the server's message and keeps the input as typed.
    pub async fn submit(&mut self) -> Submission {
        if self.input.is_blank() {
            return Submission::Skipped;
        }

        let translate = self.ctx.translate.as_ref();
        let ok = [DialogButton::ok(translate)];
        match self
            .ctx
            .backend
            .submit_guest_request(&self.input.to_submission())
            .await
        {
            Ok(()) => {
                info!(username = %self.input.username, "guest request sent");
                let title = translate.instant("guestrequest.request_success_title");
                let message = translate.instant("guestrequest.request_success_message");
                self.ctx.dialogs.message_box(&title, &message, &ok).await;
                self.ctx.navigator.reload();
                Submission::Sent
            }
            Err(err) => {
                warn!(error = %err, "guest request rejected");
                let title = translate.instant("guestrequest.error.title");
                let message = err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| translate.instant("guestrequest.error.unknown"));
                self.ctx.dialogs.message_box(&title, &message, &ok).await;
                Submission::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/guest_request_form_tests.rs"]
mod tests;
