use shared::protocol::{GuestRequestListQuery, GuestRequestSortColumn, GuestRequestSummary};
use tracing::warn;

use crate::{lister::Lister, ScreenContext};

/// Admin list of guest requests, sorted by username ascending until changed.
pub struct GuestRequestListScreen {
    ctx: ScreenContext,
    requests: Lister<GuestRequestSummary>,
    query: GuestRequestListQuery,
}

impl GuestRequestListScreen {
    pub async fn open(ctx: ScreenContext) -> Self {
        let mut screen = Self {
            ctx,
            requests: Lister::default(),
            query: GuestRequestListQuery::default(),
        };
        screen.load().await;
        screen
    }

    pub async fn load(&mut self) {
        let ticket = self.requests.begin();
        let outcome = match self.ctx.backend.list_guest_requests(self.query).await {
            Ok(list) => Ok(list.guest_requests),
            Err(err) => {
                warn!(error = %err, "guest requests: failed to load");
                Err(err.to_string())
            }
        };
        self.requests.apply(ticket, outcome);
    }

    pub async fn sort_by(&mut self, column: GuestRequestSortColumn, asc: bool) {
        self.query = GuestRequestListQuery {
            sort_column: column.index(),
            asc,
        };
        self.load().await;
    }

    pub fn judge_request(&self, request: &GuestRequestSummary) {
        self.ctx.navigator.open_guest_request_judge(request.id);
    }

    pub fn query(&self) -> GuestRequestListQuery {
        self.query
    }

    pub fn requests(&self) -> &[GuestRequestSummary] {
        self.requests.items()
    }

    pub fn error(&self) -> Option<&str> {
        self.requests.error()
    }
}

#[cfg(test)]
#[path = "tests/guest_request_list_tests.rs"]
mod tests;
