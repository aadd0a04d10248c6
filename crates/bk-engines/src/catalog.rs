//! # Book Catalog
//!
//! Catalog queries and direct catalog maintenance. "Approved & active" is
//! the only state combination ordinary readers see; rankings filter first,
//! then sort, then bound the result, so a highly-rated but unapproved book
//! can never leak into a public listing.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bk_core::error::{AppError, Result};
use bk_core::models::{Book, ReviewState};
use bk_core::traits::BookFilter;
use bk_core::StoreHandle;

/// Fields for a new catalog entry, shared by direct adds and proposals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub category: String,
    pub year: i32,
    pub isbn: Option<String>,
    pub synopsis: Option<String>,
    pub cover_image: Option<String>,
    pub file_path: Option<String>,
}

impl BookDraft {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{field} is required")));
            }
        }
        Ok(())
    }

    pub fn into_book(self, owner_profile_id: Uuid, review_state: ReviewState) -> Book {
        Book {
            id: Uuid::now_v7(),
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            category: self.category.trim().to_string(),
            year: self.year,
            isbn: self.isbn,
            synopsis: self.synopsis,
            cover_image: self.cover_image,
            file_path: self.file_path,
            owner_profile_id,
            active: true,
            review_state,
            aggregate_rating: 0.0,
            comment_ids: vec![],
            created_at: Utc::now(),
        }
    }
}

/// Partial update for an existing book's descriptive fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    pub synopsis: Option<String>,
    pub cover_image: Option<String>,
    pub file_path: Option<String>,
}

pub struct CatalogService {
    db: Arc<StoreHandle>,
}

impl CatalogService {
    pub fn new(db: Arc<StoreHandle>) -> Self {
        Self { db }
    }

    /// Direct catalog add (moderator path): lands approved and active.
    /// Proposals from members go through the Moderation Engine instead.
    pub async fn add_book(&self, owner_profile_id: Uuid, draft: BookDraft) -> Result<Book> {
        draft.validate()?;
        let repos = self.db.repos().await?;
        if repos.profiles.find_one(owner_profile_id).await?.is_none() {
            return Err(AppError::ValidationError(format!(
                "owner {owner_profile_id} does not resolve"
            )));
        }
        repos
            .books
            .insert(draft.into_book(owner_profile_id, ReviewState::Approved))
            .await
    }

    /// An active book by id; soft-deleted rows read as absent.
    pub async fn get_book(&self, id: Uuid) -> Result<Book> {
        let repos = self.db.repos().await?;
        repos
            .books
            .find_one(id)
            .await?
            .filter(|b| b.active)
            .ok_or_else(|| AppError::not_found("Book", id))
    }

    pub async fn update_book(&self, id: Uuid, patch: BookPatch) -> Result<Book> {
        let repos = self.db.repos().await?;
        let mut book = repos
            .books
            .find_one(id)
            .await?
            .filter(|b| b.active)
            .ok_or_else(|| AppError::not_found("Book", id))?;

        if let Some(title) = patch.title {
            book.title = title;
        }
        if let Some(author) = patch.author {
            book.author = author;
        }
        if let Some(category) = patch.category {
            book.category = category;
        }
        if let Some(year) = patch.year {
            book.year = year;
        }
        if patch.isbn.is_some() {
            book.isbn = patch.isbn;
        }
        if patch.synopsis.is_some() {
            book.synopsis = patch.synopsis;
        }
        if patch.cover_image.is_some() {
            book.cover_image = patch.cover_image;
        }
        if patch.file_path.is_some() {
            book.file_path = patch.file_path;
        }
        if book.title.trim().is_empty()
            || book.author.trim().is_empty()
            || book.category.trim().is_empty()
        {
            return Err(AppError::ValidationError(
                "title, author and category are required".to_string(),
            ));
        }

        repos.books.update_one(&book).await
    }

    /// Soft delete. The row and its comment linkage stay in storage.
    pub async fn retire_book(&self, id: Uuid) -> Result<()> {
        let repos = self.db.repos().await?;
        let mut book = repos
            .books
            .find_one(id)
            .await?
            .filter(|b| b.active)
            .ok_or_else(|| AppError::not_found("Book", id))?;
        book.active = false;
        repos.books.update_one(&book).await?;
        tracing::info!(book_id = %id, "book retired");
        Ok(())
    }

    /// The reader-facing catalog: approved & active only.
    pub async fn list_public(&self) -> Result<Vec<Book>> {
        let mut books = self.public_books().await?;
        books.sort_by_key(|b| b.created_at);
        Ok(books)
    }

    /// Moderator view: every state, soft-deleted included.
    pub async fn list_all(&self) -> Result<Vec<Book>> {
        let repos = self.db.repos().await?;
        let mut books = repos.books.find_many(BookFilter::default()).await?;
        books.sort_by_key(|b| b.created_at);
        Ok(books)
    }

    /// A member's own uploads, any review state, active only.
    pub async fn books_by_owner(&self, owner_profile_id: Uuid) -> Result<Vec<Book>> {
        let repos = self.db.repos().await?;
        let mut books = repos
            .books
            .find_many(BookFilter {
                owner: Some(owner_profile_id),
                active_only: true,
                review_state: None,
            })
            .await?;
        books.sort_by_key(|b| b.created_at);
        Ok(books)
    }

    /// Newest public books. Filter, then sort, then bound.
    pub async fn most_recent(&self, limit: usize) -> Result<Vec<Book>> {
        let mut books = self.public_books().await?;
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        books.truncate(limit);
        Ok(books)
    }

    /// Public books ranked by count of *active* comments (retracted reviews
    /// don't count), recency breaking ties.
    pub async fn most_commented(&self, limit: usize) -> Result<Vec<Book>> {
        let repos = self.db.repos().await?;
        let books = self.public_books().await?;

        let mut ranked = Vec::with_capacity(books.len());
        for book in books {
            let live = repos.comments.find_by_book(book.id, true).await?.len();
            ranked.push((live, book));
        }
        ranked.sort_by(|(a_count, a), (b_count, b)| {
            b_count.cmp(a_count).then(b.created_at.cmp(&a.created_at))
        });
        ranked.truncate(limit);
        Ok(ranked.into_iter().map(|(_, book)| book).collect())
    }

    /// Public books ranked by aggregate rating.
    pub async fn top_rated(&self, limit: usize) -> Result<Vec<Book>> {
        let mut books = self.public_books().await?;
        books.sort_by(|a, b| b.aggregate_rating.total_cmp(&a.aggregate_rating));
        books.truncate(limit);
        Ok(books)
    }

    async fn public_books(&self) -> Result<Vec<Book>> {
        let repos = self.db.repos().await?;
        repos
            .books
            .find_many(BookFilter {
                review_state: Some(ReviewState::Approved),
                owner: None,
                active_only: true,
            })
            .await
    }
}
