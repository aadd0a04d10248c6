//! Moderation Engine scenarios: the proposal saga, the decision state
//! machine, the reconcile repair path, and abuse reports.

mod common;

use bk_core::error::AppError;
use bk_core::models::{Actor, ReportTarget, ReviewState, Role};
use bk_core::traits::BookFilter;
use bk_engines::Decision;
use common::{app_state, book_draft, member, moderator};
use uuid::Uuid;

#[tokio::test]
async fn propose_then_approve_syncs_book_and_suggestion() {
    let (handle, state) = app_state();
    let admin = moderator(&handle, &state, "mod1").await;
    let proposer = member(&state, "proposer").await;

    let suggestion = state
        .moderation
        .propose_book(proposer.profile.id, book_draft("Rocannon's World"), "early but worth having")
        .await
        .unwrap();
    assert_eq!(suggestion.review_state, ReviewState::Pending);

    // Pending proposals never surface in the public catalog.
    assert!(state.catalog.list_public().await.unwrap().is_empty());

    // Proposer's counter bumped.
    let repos = handle.repos().await.unwrap();
    let refreshed = repos
        .profiles
        .find_one(proposer.profile.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.suggestion_count, 1);

    let actor = Actor {
        identity_id: admin.profile.identity_id,
        role: Role::Admin,
    };
    let decided = state
        .moderation
        .decide_suggestion(&actor, suggestion.id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(decided.review_state, ReviewState::Approved);

    let book = state.catalog.get_book(suggestion.proposed_book_id).await.unwrap();
    assert_eq!(book.review_state, ReviewState::Approved);
    assert_eq!(state.catalog.list_public().await.unwrap().len(), 1);
}

#[tokio::test]
async fn terminal_decisions_are_idempotent_no_ops() {
    let (handle, state) = app_state();
    let admin = moderator(&handle, &state, "mod1").await;
    let proposer = member(&state, "proposer").await;
    let actor = Actor {
        identity_id: admin.profile.identity_id,
        role: Role::Admin,
    };

    let suggestion = state
        .moderation
        .propose_book(proposer.profile.id, book_draft("Planet of Exile"), "")
        .await
        .unwrap();
    state
        .moderation
        .decide_suggestion(&actor, suggestion.id, Decision::Approve)
        .await
        .unwrap();

    // Same decision again: same state, no error.
    let again = state
        .moderation
        .decide_suggestion(&actor, suggestion.id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(again.review_state, ReviewState::Approved);

    // A contrary decision doesn't re-litigate a closed suggestion.
    let contrary = state
        .moderation
        .decide_suggestion(&actor, suggestion.id, Decision::Reject)
        .await
        .unwrap();
    assert_eq!(contrary.review_state, ReviewState::Approved);
    let book = state.catalog.get_book(suggestion.proposed_book_id).await.unwrap();
    assert_eq!(book.review_state, ReviewState::Approved);
}

#[tokio::test]
async fn missing_proposer_is_rejected_with_no_book_left_behind() {
    let (handle, state) = app_state();

    let err = state
        .moderation
        .propose_book(Uuid::now_v7(), book_draft("City of Illusions"), "")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let repos = handle.repos().await.unwrap();
    let all_books = repos.books.find_many(BookFilter::default()).await.unwrap();
    assert!(all_books.is_empty());
}

#[tokio::test]
async fn reconcile_repairs_half_applied_decision() {
    let (handle, state) = app_state();
    let proposer = member(&state, "proposer").await;
    let suggestion = state
        .moderation
        .propose_book(proposer.profile.id, book_draft("The Word for World Is Forest"), "")
        .await
        .unwrap();

    // Simulate the failure mode: suggestion decided, book write lost.
    let repos = handle.repos().await.unwrap();
    let mut decided = suggestion.clone();
    decided.review_state = ReviewState::Approved;
    repos.suggestions.update_one(&decided).await.unwrap();

    let book = state
        .moderation
        .reconcile_suggestion(suggestion.id)
        .await
        .unwrap();
    assert_eq!(book.review_state, ReviewState::Approved);

    // Nothing to repair on a pending suggestion.
    let fresh = state
        .moderation
        .propose_book(proposer.profile.id, book_draft("Malafrena"), "")
        .await
        .unwrap();
    let err = state.moderation.reconcile_suggestion(fresh.id).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn suggestion_listing_keeps_full_history() {
    let (handle, state) = app_state();
    let admin = moderator(&handle, &state, "mod1").await;
    let proposer = member(&state, "proposer").await;
    let actor = Actor {
        identity_id: admin.profile.identity_id,
        role: Role::Admin,
    };

    let s1 = state
        .moderation
        .propose_book(proposer.profile.id, book_draft("Orsinian Tales"), "")
        .await
        .unwrap();
    state
        .moderation
        .propose_book(proposer.profile.id, book_draft("Searoad"), "")
        .await
        .unwrap();
    state
        .moderation
        .decide_suggestion(&actor, s1.id, Decision::Reject)
        .await
        .unwrap();

    assert_eq!(state.moderation.list_suggestions(None).await.unwrap().len(), 2);
    let rejected = state
        .moderation
        .list_suggestions(Some(ReviewState::Rejected))
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].id, s1.id);

    let detail = state.moderation.get_suggestion(s1.id).await.unwrap();
    assert_eq!(detail.suggestion.id, s1.id);
    assert_eq!(detail.book.unwrap().title, "Orsinian Tales");
    assert_eq!(detail.proposer.unwrap().id, proposer.profile.id);
}

#[tokio::test]
async fn duplicate_report_conflicts_and_first_stays_active() {
    let (_handle, state) = app_state();
    let owner = member(&state, "owner").await;
    let p1 = member(&state, "p1").await;
    let reporter = member(&state, "reporter").await;
    let book = state
        .catalog
        .add_book(owner.profile.id, book_draft("Tehanu"))
        .await
        .unwrap();
    let review = state
        .reviews
        .submit_review(book.id, p1.profile.id, "unpopular opinion", 1)
        .await
        .unwrap();

    let report = state
        .moderation
        .file_report(ReportTarget::Comment(review.id), reporter.profile.id, "abusive tone")
        .await
        .unwrap();

    let err = state
        .moderation
        .file_report(ReportTarget::Comment(review.id), reporter.profile.id, "still abusive")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let active = state.moderation.list_reports(true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, report.id);

    state.moderation.resolve_report(report.id).await.unwrap();
    assert!(state.moderation.list_reports(true).await.unwrap().is_empty());
    assert_eq!(state.moderation.list_reports(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reply_reports_resolve_through_owning_comment() {
    let (_handle, state) = app_state();
    let owner = member(&state, "owner").await;
    let p1 = member(&state, "p1").await;
    let p2 = member(&state, "p2").await;
    let reporter = member(&state, "reporter").await;
    let book = state
        .catalog
        .add_book(owner.profile.id, book_draft("The Other Wind"))
        .await
        .unwrap();
    let review = state
        .reviews
        .submit_review(book.id, p1.profile.id, "a fine close", 4)
        .await
        .unwrap();
    let reply = state
        .reviews
        .add_reply(review.id, p2.profile.id, "spam link here")
        .await
        .unwrap();

    state
        .moderation
        .file_report(ReportTarget::Reply(reply.id), reporter.profile.id, "spam")
        .await
        .unwrap();

    // A retracted reply is no longer reportable.
    state.reviews.retract_reply(review.id, reply.id).await.unwrap();
    let err = state
        .moderation
        .file_report(ReportTarget::Reply(reply.id), owner.profile.id, "spam")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_, _)));
}
