use super::*;
use crate::{
    interaction::DialogOutcome,
    test_support::{guest_request, Call, Harness},
};
use shared::domain::GuestRequestId;

#[tokio::test]
async fn opens_sorted_by_username_ascending() {
    let harness = Harness::new(DialogOutcome::Ok);
    harness
        .backend
        .guest_requests
        .lock()
        .expect("requests")
        .push(guest_request(GuestRequestId::generate(), "visitor"));

    let screen = GuestRequestListScreen::open(harness.ctx()).await;

    assert_eq!(
        harness.backend.calls(),
        vec![Call::ListGuest(GuestRequestListQuery {
            sort_column: 1,
            asc: true
        })]
    );
    assert_eq!(screen.requests().len(), 1);
    assert_eq!(screen.error(), None);
}

#[tokio::test]
async fn changing_sort_reloads_with_new_query() {
    let harness = Harness::new(DialogOutcome::Ok);
    let mut screen = GuestRequestListScreen::open(harness.ctx()).await;

    screen
        .sort_by(GuestRequestSortColumn::CreateDate, false)
        .await;

    assert_eq!(
        harness.backend.calls().last(),
        Some(&Call::ListGuest(GuestRequestListQuery {
            sort_column: 3,
            asc: false
        }))
    );
    assert_eq!(screen.query().column(), GuestRequestSortColumn::CreateDate);
}

#[tokio::test]
async fn judging_navigates_to_the_request() {
    let harness = Harness::new(DialogOutcome::Ok);
    let id = GuestRequestId::generate();
    harness
        .backend
        .guest_requests
        .lock()
        .expect("requests")
        .push(guest_request(id, "visitor"));
    let screen = GuestRequestListScreen::open(harness.ctx()).await;

    screen.judge_request(&screen.requests()[0]);

    assert_eq!(*harness.navigator.opened.lock().expect("opened"), vec![id]);
}
