//! Catalog queries: the approved-&-active gate and the
//! filter-before-sort-before-limit order on every ranking.

mod common;

use bk_engines::BookDraft;
use common::{app_state, book_draft, member};

fn draft(title: &str, author: &str) -> BookDraft {
    BookDraft {
        author: author.to_string(),
        ..book_draft(title)
    }
}

#[tokio::test]
async fn unapproved_books_never_leak_into_rankings() {
    let (_handle, state) = app_state();
    let owner = member(&state, "owner").await;
    let reviewer = member(&state, "reviewer").await;

    let approved = state
        .catalog
        .add_book(owner.profile.id, draft("Solaris", "Stanisław Lem"))
        .await
        .unwrap();
    state
        .reviews
        .submit_review(approved.id, reviewer.profile.id, "good", 3)
        .await
        .unwrap();

    // A pending proposal with a glowing review must stay invisible.
    let suggestion = state
        .moderation
        .propose_book(owner.profile.id, draft("Fiasco", "Stanisław Lem"), "")
        .await
        .unwrap();
    state
        .reviews
        .submit_review(suggestion.proposed_book_id, reviewer.profile.id, "amazing", 5)
        .await
        .unwrap();

    for ranking in [
        state.catalog.top_rated(10).await.unwrap(),
        state.catalog.most_recent(10).await.unwrap(),
        state.catalog.most_commented(10).await.unwrap(),
        state.catalog.list_public().await.unwrap(),
    ] {
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].id, approved.id);
    }
}

#[tokio::test]
async fn most_commented_counts_active_comments_only() {
    let (_handle, state) = app_state();
    let owner = member(&state, "owner").await;
    let p1 = member(&state, "p1").await;
    let p2 = member(&state, "p2").await;
    let p3 = member(&state, "p3").await;

    let quiet = state
        .catalog
        .add_book(owner.profile.id, draft("The Invincible", "Stanisław Lem"))
        .await
        .unwrap();
    let busy = state
        .catalog
        .add_book(owner.profile.id, draft("Eden", "Stanisław Lem"))
        .await
        .unwrap();

    // "busy" collects three reviews but loses two to retraction.
    for reader in [&p1, &p2, &p3] {
        state
            .reviews
            .submit_review(busy.id, reader.profile.id, "noted", 3)
            .await
            .unwrap();
    }
    let busy_reviews = state.reviews.list_reviews_for_book(busy.id).await.unwrap();
    state.reviews.retract_review(busy_reviews[0].id).await.unwrap();
    state.reviews.retract_review(busy_reviews[1].id).await.unwrap();

    // "quiet" keeps both of its reviews.
    for reader in [&p1, &p2] {
        state
            .reviews
            .submit_review(quiet.id, reader.profile.id, "noted", 4)
            .await
            .unwrap();
    }

    let ranked = state.catalog.most_commented(10).await.unwrap();
    assert_eq!(ranked[0].id, quiet.id);
    assert_eq!(ranked[1].id, busy.id);

    let bounded = state.catalog.most_commented(1).await.unwrap();
    assert_eq!(bounded.len(), 1);
    assert_eq!(bounded[0].id, quiet.id);
}

#[tokio::test]
async fn top_rated_orders_by_aggregate() {
    let (_handle, state) = app_state();
    let owner = member(&state, "owner").await;
    let reviewer = member(&state, "reviewer").await;

    let low = state
        .catalog
        .add_book(owner.profile.id, draft("Return from the Stars", "Stanisław Lem"))
        .await
        .unwrap();
    let high = state
        .catalog
        .add_book(owner.profile.id, draft("His Master's Voice", "Stanisław Lem"))
        .await
        .unwrap();
    let unrated = state
        .catalog
        .add_book(owner.profile.id, draft("Peace on Earth", "Stanisław Lem"))
        .await
        .unwrap();

    state
        .reviews
        .submit_review(low.id, reviewer.profile.id, "fine", 2)
        .await
        .unwrap();
    state
        .reviews
        .submit_review(high.id, reviewer.profile.id, "superb", 5)
        .await
        .unwrap();

    let ranked = state.catalog.top_rated(10).await.unwrap();
    assert_eq!(
        ranked.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![high.id, low.id, unrated.id]
    );
}

#[tokio::test]
async fn retired_books_disappear_from_reader_paths() {
    let (_handle, state) = app_state();
    let owner = member(&state, "owner").await;
    let book = state
        .catalog
        .add_book(owner.profile.id, draft("Memoirs Found in a Bathtub", "Stanisław Lem"))
        .await
        .unwrap();

    state.catalog.retire_book(book.id).await.unwrap();

    assert!(state.catalog.list_public().await.unwrap().is_empty());
    assert!(state.catalog.get_book(book.id).await.is_err());
    assert!(state.catalog.books_by_owner(owner.profile.id).await.unwrap().is_empty());
    // The moderator view still shows the row.
    assert_eq!(state.catalog.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_triple_conflicts_in_direct_adds() {
    let (_handle, state) = app_state();
    let owner = member(&state, "owner").await;
    state
        .catalog
        .add_book(owner.profile.id, draft("Cyberiad", "Stanisław Lem"))
        .await
        .unwrap();
    let err = state
        .catalog
        .add_book(owner.profile.id, draft("Cyberiad", "Stanisław Lem"))
        .await
        .unwrap_err();
    assert!(matches!(err, bk_core::AppError::Conflict(_)));
}
