//! # bk-api Handlers
//!
//! This module coordinates the flow between inbound operations and the
//! engines. Every function folds the engine's typed result into the
//! response envelope; errors never cross this boundary as panics.

use serde::Deserialize;
use uuid::Uuid;

use bk_core::envelope::{envelope_created, envelope_ok};
use bk_core::models::{ReportTarget, ReviewState};
use bk_core::traits::AuthGate;
use bk_core::{ApiResponse, AppError};
use bk_engines::{
    BookDraft, BookPatch, CatalogService, Decision, ModerationEngine, ProfileDraft, ProfilePatch,
    ProfileService, ReviewEngine, ReviewPatch,
};

/// State shared across all transport workers.
pub struct AppState {
    pub reviews: ReviewEngine,
    pub moderation: ModerationEngine,
    pub catalog: CatalogService,
    pub profiles: ProfileService,
    pub auth: std::sync::Arc<dyn AuthGate>,
}

#[derive(Debug, Deserialize)]
pub struct NewReview {
    pub book_id: Uuid,
    pub reviewer_id: Uuid,
    pub body: String,
    pub stars: u8,
}

#[derive(Debug, Deserialize)]
pub struct NewReply {
    pub author_id: Uuid,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct Proposal {
    pub proposer_id: Uuid,
    pub book: BookDraft,
    pub initial_comment: String,
}

#[derive(Debug, Deserialize)]
pub struct NewReport {
    /// "comment" or "reply"
    pub target_kind: String,
    pub target_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
}

// ── Reviews ─────────────────────────────────────────────────────────────────

pub async fn submit_review(state: &AppState, input: NewReview) -> ApiResponse {
    envelope_created(
        "review submitted",
        state
            .reviews
            .submit_review(input.book_id, input.reviewer_id, &input.body, input.stars)
            .await,
    )
}

pub async fn list_reviews_for_book(state: &AppState, book_id: Uuid) -> ApiResponse {
    envelope_ok(
        "reviews fetched",
        state.reviews.list_reviews_for_book(book_id).await,
    )
}

pub async fn list_reviews_by_reviewer(state: &AppState, reviewer_id: Uuid) -> ApiResponse {
    envelope_ok(
        "reviews fetched",
        state.reviews.list_reviews_by_reviewer(reviewer_id).await,
    )
}

pub async fn edit_review(state: &AppState, comment_id: Uuid, patch: ReviewPatch) -> ApiResponse {
    envelope_ok(
        "review updated",
        state.reviews.edit_review(comment_id, patch).await,
    )
}

pub async fn retract_review(state: &AppState, comment_id: Uuid) -> ApiResponse {
    match state.reviews.retract_review(comment_id).await {
        Ok(()) => ApiResponse::ok_empty("review retracted"),
        Err(err) => ApiResponse::from_error(&err),
    }
}

pub async fn add_reply(state: &AppState, comment_id: Uuid, input: NewReply) -> ApiResponse {
    envelope_created(
        "reply added",
        state
            .reviews
            .add_reply(comment_id, input.author_id, &input.body)
            .await,
    )
}

pub async fn retract_reply(state: &AppState, comment_id: Uuid, reply_id: Uuid) -> ApiResponse {
    match state.reviews.retract_reply(comment_id, reply_id).await {
        Ok(()) => ApiResponse::ok_empty("reply retracted"),
        Err(err) => ApiResponse::from_error(&err),
    }
}

// ── Moderation ──────────────────────────────────────────────────────────────

pub async fn propose_book(state: &AppState, input: Proposal) -> ApiResponse {
    envelope_created(
        "suggestion created",
        state
            .moderation
            .propose_book(input.proposer_id, input.book, &input.initial_comment)
            .await,
    )
}

pub async fn list_suggestions(state: &AppState, review_state: Option<ReviewState>) -> ApiResponse {
    envelope_ok(
        "suggestions fetched",
        state.moderation.list_suggestions(review_state).await,
    )
}

pub async fn get_suggestion(state: &AppState, id: Uuid) -> ApiResponse {
    envelope_ok("suggestion fetched", state.moderation.get_suggestion(id).await)
}

/// Moderator-only: the bearer token is resolved to an actor first, and the
/// engine re-checks the moderator capability.
pub async fn decide_suggestion(
    state: &AppState,
    token: &str,
    id: Uuid,
    decision: &str,
) -> ApiResponse {
    let actor = match state.auth.verify_actor(token).await {
        Ok(actor) => actor,
        Err(err) => return ApiResponse::from_error(&err),
    };
    let decision = match parse_decision(decision) {
        Ok(decision) => decision,
        Err(err) => return ApiResponse::from_error(&err),
    };
    envelope_ok(
        "suggestion decided",
        state.moderation.decide_suggestion(&actor, id, decision).await,
    )
}

pub async fn reconcile_suggestion(state: &AppState, id: Uuid) -> ApiResponse {
    envelope_ok(
        "suggestion reconciled",
        state.moderation.reconcile_suggestion(id).await,
    )
}

pub async fn file_report(state: &AppState, input: NewReport) -> ApiResponse {
    let target = match parse_target(&input.target_kind, input.target_id) {
        Ok(target) => target,
        Err(err) => return ApiResponse::from_error(&err),
    };
    envelope_created(
        "report filed",
        state
            .moderation
            .file_report(target, input.reporter_id, &input.reason)
            .await,
    )
}

pub async fn list_reports(state: &AppState, active_only: bool) -> ApiResponse {
    envelope_ok(
        "reports fetched",
        state.moderation.list_reports(active_only).await,
    )
}

pub async fn resolve_report(state: &AppState, id: Uuid) -> ApiResponse {
    envelope_ok("report resolved", state.moderation.resolve_report(id).await)
}

// ── Catalog ─────────────────────────────────────────────────────────────────

pub async fn add_book(state: &AppState, owner_profile_id: Uuid, draft: BookDraft) -> ApiResponse {
    envelope_created(
        "book created",
        state.catalog.add_book(owner_profile_id, draft).await,
    )
}

pub async fn get_book(state: &AppState, id: Uuid) -> ApiResponse {
    envelope_ok("book fetched", state.catalog.get_book(id).await)
}

pub async fn update_book(state: &AppState, id: Uuid, patch: BookPatch) -> ApiResponse {
    envelope_ok("book updated", state.catalog.update_book(id, patch).await)
}

pub async fn retire_book(state: &AppState, id: Uuid) -> ApiResponse {
    match state.catalog.retire_book(id).await {
        Ok(()) => ApiResponse::ok_empty("book retired"),
        Err(err) => ApiResponse::from_error(&err),
    }
}

pub async fn list_books(state: &AppState) -> ApiResponse {
    envelope_ok("books fetched", state.catalog.list_public().await)
}

pub async fn list_all_books(state: &AppState) -> ApiResponse {
    envelope_ok("books fetched", state.catalog.list_all().await)
}

pub async fn books_by_owner(state: &AppState, owner_profile_id: Uuid) -> ApiResponse {
    envelope_ok(
        "books fetched",
        state.catalog.books_by_owner(owner_profile_id).await,
    )
}

pub async fn most_recent_books(state: &AppState, limit: usize) -> ApiResponse {
    envelope_ok("books fetched", state.catalog.most_recent(limit).await)
}

pub async fn most_commented_books(state: &AppState, limit: usize) -> ApiResponse {
    envelope_ok("books fetched", state.catalog.most_commented(limit).await)
}

pub async fn top_rated_books(state: &AppState, limit: usize) -> ApiResponse {
    envelope_ok("books fetched", state.catalog.top_rated(limit).await)
}

// ── Profiles ────────────────────────────────────────────────────────────────

pub async fn register_profile(state: &AppState, draft: ProfileDraft) -> ApiResponse {
    envelope_created(
        "profile registered",
        state.profiles.register_profile(draft).await,
    )
}

pub async fn get_profile(state: &AppState, identity_id: Uuid) -> ApiResponse {
    envelope_ok("profile fetched", state.profiles.get_profile(identity_id).await)
}

pub async fn list_profiles(state: &AppState) -> ApiResponse {
    envelope_ok("profiles fetched", state.profiles.list_profiles().await)
}

pub async fn update_profile(state: &AppState, profile_id: Uuid, patch: ProfilePatch) -> ApiResponse {
    envelope_ok(
        "profile updated",
        state.profiles.update_profile(profile_id, patch).await,
    )
}

pub async fn deactivate_profile(state: &AppState, profile_id: Uuid) -> ApiResponse {
    match state.profiles.deactivate_profile(profile_id).await {
        Ok(()) => ApiResponse::ok_empty("profile deactivated"),
        Err(err) => ApiResponse::from_error(&err),
    }
}

pub async fn save_book(state: &AppState, profile_id: Uuid, book_id: Uuid) -> ApiResponse {
    envelope_ok(
        "book saved",
        state.profiles.save_book(profile_id, book_id).await,
    )
}

pub async fn unsave_book(state: &AppState, profile_id: Uuid, book_id: Uuid) -> ApiResponse {
    envelope_ok(
        "book removed from saved list",
        state.profiles.unsave_book(profile_id, book_id).await,
    )
}

pub async fn saved_books(state: &AppState, profile_id: Uuid) -> ApiResponse {
    envelope_ok(
        "saved books fetched",
        state.profiles.saved_books(profile_id).await,
    )
}

fn parse_decision(raw: &str) -> Result<Decision, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "approve" | "approved" => Ok(Decision::Approve),
        "reject" | "rejected" => Ok(Decision::Reject),
        other => Err(AppError::ValidationError(format!(
            "unknown decision '{other}', expected approve or reject"
        ))),
    }
}

fn parse_target(kind: &str, id: Uuid) -> Result<ReportTarget, AppError> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "comment" => Ok(ReportTarget::Comment(id)),
        "reply" => Ok(ReportTarget::Reply(id)),
        other => Err(AppError::ValidationError(format!(
            "unknown report target kind '{other}', expected comment or reply"
        ))),
    }
}
