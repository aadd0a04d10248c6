//! # Moderation Engine
//!
//! Book-submission review workflow and abuse reporting. Drives the
//! pending → approved | rejected state machine shared by Book and
//! Suggestion: the suggestion row holds the decision of record, the linked
//! book is brought along, and `reconcile_suggestion` is the repair path when
//! the second write of that pair fails.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use bk_core::error::{AppError, Result};
use bk_core::models::{
    Actor, Book, Comment, Profile, Report, ReportTarget, ReviewState, Suggestion,
};
use bk_core::traits::Repos;
use bk_core::StoreHandle;

use crate::catalog::BookDraft;

/// A moderator's verdict on a pending suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for ReviewState {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => ReviewState::Approved,
            Decision::Reject => ReviewState::Rejected,
        }
    }
}

/// Populated view of one suggestion, for the moderation queue.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionDetail {
    pub suggestion: Suggestion,
    pub book: Option<Book>,
    pub proposer: Option<Profile>,
    /// Active discussion comments only
    pub comments: Vec<Comment>,
}

pub struct ModerationEngine {
    db: Arc<StoreHandle>,
}

impl ModerationEngine {
    pub fn new(db: Arc<StoreHandle>) -> Self {
        Self { db }
    }

    /// Creates a pending Book and the Suggestion referencing it, as one
    /// logical unit: if the Suggestion insert fails, the Book is rolled back
    /// so no orphan pending books survive.
    pub async fn propose_book(
        &self,
        proposer_id: Uuid,
        draft: BookDraft,
        initial_comment: &str,
    ) -> Result<Suggestion> {
        draft.validate()?;
        let repos = self.db.repos().await?;
        let proposer = repos
            .profiles
            .find_one(proposer_id)
            .await?
            .ok_or_else(|| {
                AppError::ValidationError(format!("proposer {proposer_id} does not resolve"))
            })?;

        let book = repos
            .books
            .insert(draft.into_book(proposer_id, ReviewState::Pending))
            .await?;

        let suggestion = Suggestion {
            id: Uuid::now_v7(),
            proposed_book_id: book.id,
            proposer_profile_id: proposer_id,
            initial_comment: initial_comment.trim().to_string(),
            review_state: ReviewState::Pending,
            active: true,
            comment_ids: vec![],
            created_at: Utc::now(),
        };
        let suggestion = match repos.suggestions.insert(suggestion).await {
            Ok(suggestion) => suggestion,
            Err(err) => {
                if let Err(comp_err) = repos.books.delete_one(book.id).await {
                    tracing::error!(
                        book_id = %book.id,
                        error = %comp_err,
                        "compensating delete failed; orphan pending book left for reconciliation"
                    );
                }
                return Err(err);
            }
        };

        // Counter bump is best-effort; a miss never fails the proposal.
        let mut proposer = proposer;
        proposer.suggestion_count += 1;
        if let Err(err) = repos.profiles.update_one(&proposer).await {
            tracing::warn!(profile_id = %proposer.id, error = %err, "suggestion counter not bumped");
        }

        tracing::info!(suggestion_id = %suggestion.id, book_id = %book.id, "book proposed");
        Ok(suggestion)
    }

    /// Full suggestion history, optionally narrowed to one state, oldest
    /// first. No implicit active-only filter: moderators see everything.
    pub async fn list_suggestions(&self, state: Option<ReviewState>) -> Result<Vec<Suggestion>> {
        let repos = self.db.repos().await?;
        let mut suggestions = repos.suggestions.find_many(state).await?;
        suggestions.sort_by_key(|s| s.created_at);
        Ok(suggestions)
    }

    /// Populated view: proposed book, proposer, active discussion comments.
    pub async fn get_suggestion(&self, id: Uuid) -> Result<SuggestionDetail> {
        let repos = self.db.repos().await?;
        let suggestion = repos
            .suggestions
            .find_one(id)
            .await?
            .filter(|s| s.active)
            .ok_or_else(|| AppError::not_found("Suggestion", id))?;

        let book = repos.books.find_one(suggestion.proposed_book_id).await?;
        let proposer = repos
            .profiles
            .find_one(suggestion.proposer_profile_id)
            .await?;

        let mut comments = Vec::with_capacity(suggestion.comment_ids.len());
        for comment_id in &suggestion.comment_ids {
            if let Some(comment) = repos
                .comments
                .find_one(*comment_id)
                .await?
                .filter(|c| c.active)
            {
                comments.push(comment);
            }
        }

        Ok(SuggestionDetail {
            suggestion,
            book,
            proposer,
            comments,
        })
    }

    /// Applies a moderator decision to a pending suggestion and its book.
    ///
    /// Terminal suggestions are idempotent no-ops: the current row comes
    /// back unchanged with no second book write; a closed suggestion is not
    /// re-litigated. The suggestion is written first; if the book write
    /// then fails, the error names `reconcile_suggestion` as the repair.
    pub async fn decide_suggestion(
        &self,
        actor: &Actor,
        id: Uuid,
        decision: Decision,
    ) -> Result<Suggestion> {
        if !actor.is_moderator() {
            return Err(AppError::Unauthorized(
                "suggestion decisions require a moderator".to_string(),
            ));
        }
        let repos = self.db.repos().await?;
        let mut suggestion = repos
            .suggestions
            .find_one(id)
            .await?
            .ok_or_else(|| AppError::not_found("Suggestion", id))?;

        if suggestion.review_state.is_terminal() {
            return Ok(suggestion);
        }

        suggestion.review_state = decision.into();
        let suggestion = repos.suggestions.update_one(&suggestion).await?;
        if let Err(err) = self
            .align_book_state(&repos, suggestion.proposed_book_id, suggestion.review_state)
            .await
        {
            tracing::error!(
                suggestion_id = %id,
                book_id = %suggestion.proposed_book_id,
                error = %err,
                "suggestion decided but book state not updated; reconcile_suggestion repairs this"
            );
            return Err(AppError::Internal(format!(
                "suggestion {id} decided but its book was not updated; run reconcile: {err}"
            )));
        }

        tracing::info!(
            suggestion_id = %id,
            state = ?suggestion.review_state,
            moderator = %actor.identity_id,
            "suggestion decided"
        );
        Ok(suggestion)
    }

    /// Repair path for a half-applied decision: re-aligns the linked book's
    /// `review_state` with the suggestion's terminal state.
    pub async fn reconcile_suggestion(&self, id: Uuid) -> Result<Book> {
        let repos = self.db.repos().await?;
        let suggestion = repos
            .suggestions
            .find_one(id)
            .await?
            .ok_or_else(|| AppError::not_found("Suggestion", id))?;
        if !suggestion.review_state.is_terminal() {
            return Err(AppError::ValidationError(
                "suggestion is still pending; nothing to reconcile".to_string(),
            ));
        }
        self.align_book_state(&repos, suggestion.proposed_book_id, suggestion.review_state)
            .await
    }

    async fn align_book_state(
        &self,
        repos: &Repos,
        book_id: Uuid,
        state: ReviewState,
    ) -> Result<Book> {
        let mut book = repos
            .books
            .find_one(book_id)
            .await?
            .ok_or_else(|| AppError::not_found("Book", book_id))?;
        if book.review_state == state {
            return Ok(book);
        }
        book.review_state = state;
        repos.books.update_one(&book).await
    }

    /// Raises an abuse flag. One report per (target, reporter); the store
    /// rejects the duplicate. Reply targets resolve through their owning
    /// comment, since replies are not addressable across collections.
    pub async fn file_report(
        &self,
        target: ReportTarget,
        reporter_id: Uuid,
        reason: &str,
    ) -> Result<Report> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::ValidationError(
                "report reason must not be empty".to_string(),
            ));
        }
        let repos = self.db.repos().await?;
        let mut owning_comment = self.live_target(&repos, target).await?;

        let report = repos
            .reports
            .insert(Report {
                id: Uuid::now_v7(),
                target,
                reporter_profile_id: reporter_id,
                reason: reason.to_string(),
                active: true,
                created_at: Utc::now(),
            })
            .await?;

        // Back-link on the target is best-effort bookkeeping.
        match target {
            ReportTarget::Comment(_) => owning_comment.report_ids.push(report.id),
            ReportTarget::Reply(reply_id) => {
                if let Some(reply) = owning_comment.replies.iter_mut().find(|r| r.id == reply_id) {
                    reply.report_ids.push(report.id);
                }
            }
        }
        if let Err(err) = repos.comments.update_one(&owning_comment).await {
            tracing::warn!(report_id = %report.id, error = %err, "report back-link not recorded");
        }

        Ok(report)
    }

    pub async fn list_reports(&self, active_only: bool) -> Result<Vec<Report>> {
        let repos = self.db.repos().await?;
        let mut reports = repos.reports.find_many(active_only).await?;
        reports.sort_by_key(|r| r.created_at);
        Ok(reports)
    }

    /// Soft-delete, identical semantics to comment retraction.
    pub async fn resolve_report(&self, id: Uuid) -> Result<Report> {
        let repos = self.db.repos().await?;
        let mut report = repos
            .reports
            .find_one(id)
            .await?
            .filter(|r| r.active)
            .ok_or_else(|| AppError::not_found("Report", id))?;
        report.active = false;
        repos.reports.update_one(&report).await
    }

    /// Resolves the comment owning the target and checks the target is live.
    async fn live_target(&self, repos: &Repos, target: ReportTarget) -> Result<Comment> {
        match target {
            ReportTarget::Comment(id) => repos
                .comments
                .find_one(id)
                .await?
                .filter(|c| c.active)
                .ok_or_else(|| AppError::not_found("Comment", id)),
            ReportTarget::Reply(id) => {
                let comment = repos
                    .comments
                    .find_by_reply(id)
                    .await?
                    .filter(|c| c.active)
                    .ok_or_else(|| AppError::not_found("Reply", id))?;
                let live = comment.replies.iter().any(|r| r.id == id && r.active);
                if live {
                    Ok(comment)
                } else {
                    Err(AppError::not_found("Reply", id))
                }
            }
        }
    }
}
