//! # Review Engine
//!
//! Owns the Comment/Reply lifecycle and keeps `Book.aggregate_rating` and
//! `Book.comment_ids` consistent with the active-comment set. Replies are
//! embedded in their comment and soft-deleted in place; comments are
//! soft-deleted but their ids stay in `Book.comment_ids` as historical
//! linkage.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use bk_core::error::{AppError, Result};
use bk_core::models::{Comment, Reply, MAX_REPLY_LEN};
use bk_core::traits::Repos;
use bk_core::StoreHandle;

use crate::rating;

/// Partial update for an existing review.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    pub body: Option<String>,
    pub stars: Option<u8>,
}

pub struct ReviewEngine {
    db: Arc<StoreHandle>,
}

impl ReviewEngine {
    pub fn new(db: Arc<StoreHandle>) -> Self {
        Self { db }
    }

    /// Creates a review and folds it into the book's aggregate.
    ///
    /// The (book, reviewer) uniqueness among active comments is enforced by
    /// the store at insert time; two simultaneous submissions resolve to one
    /// success and one `Conflict`. If the book update fails after the
    /// comment was persisted (book retired concurrently), the comment is
    /// rolled back with a compensating delete.
    pub async fn submit_review(
        &self,
        book_id: Uuid,
        reviewer_id: Uuid,
        body: &str,
        stars: u8,
    ) -> Result<Comment> {
        validate_stars(stars)?;
        let body = non_empty(body, "review body")?;
        let repos = self.db.repos().await?;

        let mut book = repos
            .books
            .find_one(book_id)
            .await?
            .filter(|b| b.active)
            .ok_or_else(|| AppError::not_found("Book", book_id))?;

        let comment = repos
            .comments
            .insert(Comment {
                id: Uuid::now_v7(),
                book_id,
                author_profile_id: reviewer_id,
                body,
                stars,
                active: true,
                created_at: Utc::now(),
                replies: vec![],
                report_ids: vec![],
            })
            .await?;

        book.comment_ids.push(comment.id);
        book.aggregate_rating = self.recompute_rating(&repos, book_id).await?;
        if let Err(err) = repos.books.update_one(&book).await {
            // The book vanished between the read and the write; roll the
            // comment back to keep comment_ids and the comment set aligned.
            if let Err(comp_err) = repos.comments.delete_one(comment.id).await {
                tracing::error!(
                    comment_id = %comment.id,
                    book_id = %book_id,
                    error = %comp_err,
                    "compensating delete failed; dangling comment left for reconciliation"
                );
            }
            return Err(err);
        }

        tracing::info!(comment_id = %comment.id, book_id = %book_id, stars, "review submitted");
        Ok(comment)
    }

    /// Active reviews for a book, active replies only, oldest first.
    pub async fn list_reviews_for_book(&self, book_id: Uuid) -> Result<Vec<Comment>> {
        let repos = self.db.repos().await?;
        let comments = repos.comments.find_by_book(book_id, true).await?;
        Ok(presentable(comments))
    }

    /// Active reviews written by a reader, active replies only, oldest first.
    pub async fn list_reviews_by_reviewer(&self, reviewer_id: Uuid) -> Result<Vec<Comment>> {
        let repos = self.db.repos().await?;
        let comments = repos.comments.find_by_author(reviewer_id, true).await?;
        Ok(presentable(comments))
    }

    /// Partial update. Changing `stars` re-aggregates the book's rating.
    pub async fn edit_review(&self, comment_id: Uuid, patch: ReviewPatch) -> Result<Comment> {
        let repos = self.db.repos().await?;
        let mut comment = self.active_comment(&repos, comment_id).await?;

        let mut stars_changed = false;
        if let Some(stars) = patch.stars {
            validate_stars(stars)?;
            stars_changed = stars != comment.stars;
            comment.stars = stars;
        }
        if let Some(body) = patch.body {
            comment.body = non_empty(&body, "review body")?;
        }

        let comment = repos.comments.update_one(&comment).await?;
        if stars_changed {
            self.refresh_book_rating(&repos, comment.book_id).await?;
        }
        Ok(comment)
    }

    /// Soft-delete: flips `active`, keeps the id in `Book.comment_ids`, and
    /// re-aggregates the rating without the retracted review.
    pub async fn retract_review(&self, comment_id: Uuid) -> Result<()> {
        let repos = self.db.repos().await?;
        let mut comment = self.active_comment(&repos, comment_id).await?;

        comment.active = false;
        repos.comments.update_one(&comment).await?;
        self.refresh_book_rating(&repos, comment.book_id).await?;
        tracing::info!(comment_id = %comment_id, "review retracted");
        Ok(())
    }

    /// Appends an active reply to a live comment.
    pub async fn add_reply(&self, comment_id: Uuid, author_id: Uuid, body: &str) -> Result<Reply> {
        let body = non_empty(body, "reply body")?;
        if body.chars().count() > MAX_REPLY_LEN {
            return Err(AppError::ValidationError(format!(
                "reply body exceeds {MAX_REPLY_LEN} characters"
            )));
        }
        let repos = self.db.repos().await?;
        let mut comment = self.active_comment(&repos, comment_id).await?;

        let reply = Reply {
            id: Uuid::now_v7(),
            author_profile_id: author_id,
            body,
            active: true,
            created_at: Utc::now(),
            report_ids: vec![],
        };
        comment.replies.push(reply.clone());
        repos.comments.update_one(&comment).await?;
        Ok(reply)
    }

    /// Flips one reply's `active` flag. Replies carry no aggregate, so no
    /// cascade follows.
    pub async fn retract_reply(&self, comment_id: Uuid, reply_id: Uuid) -> Result<()> {
        let repos = self.db.repos().await?;
        let mut comment = repos
            .comments
            .find_one(comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment", comment_id))?;

        let reply = comment
            .replies
            .iter_mut()
            .find(|r| r.id == reply_id && r.active)
            .ok_or_else(|| AppError::not_found("Reply", reply_id))?;
        reply.active = false;

        repos.comments.update_one(&comment).await?;
        Ok(())
    }

    async fn active_comment(&self, repos: &Repos, comment_id: Uuid) -> Result<Comment> {
        repos
            .comments
            .find_one(comment_id)
            .await?
            .filter(|c| c.active)
            .ok_or_else(|| AppError::not_found("Comment", comment_id))
    }

    /// Fresh read-then-aggregate over the book's active comments.
    async fn recompute_rating(&self, repos: &Repos, book_id: Uuid) -> Result<f64> {
        let active = repos.comments.find_by_book(book_id, true).await?;
        Ok(rating::mean_stars(&active))
    }

    async fn refresh_book_rating(&self, repos: &Repos, book_id: Uuid) -> Result<()> {
        let Some(mut book) = repos.books.find_one(book_id).await? else {
            // The comment now dangles; the reconciliation sweep can find it
            // through its book_id.
            tracing::warn!(book_id = %book_id, "rating refresh skipped; book no longer present");
            return Ok(());
        };
        book.aggregate_rating = self.recompute_rating(repos, book_id).await?;
        repos.books.update_one(&book).await?;
        Ok(())
    }
}

/// Reader-facing shape: active replies only, creation order.
fn presentable(mut comments: Vec<Comment>) -> Vec<Comment> {
    for comment in &mut comments {
        comment.replies.retain(|r| r.active);
    }
    comments.sort_by_key(|c| c.created_at);
    comments
}

fn validate_stars(stars: u8) -> Result<()> {
    if (1..=5).contains(&stars) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "stars must be between 1 and 5, got {stars}"
        )))
    }
}

fn non_empty(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::ValidationError(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}
