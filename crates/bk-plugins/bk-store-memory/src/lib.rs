//! # bk-store-memory Implementation
//!
//! In-memory implementation of the `bk-core` repository ports, backing local
//! runs and tests. Collections are `RwLock`-guarded maps; uniqueness checks
//! run inside the write lock, so conflicting concurrent inserts resolve to
//! exactly one success, the same write-time guarantee a document database
//! gives through its unique indexes.
//!
//! Uniqueness scopes follow the domain invariants:
//! - Identity.handle and Profile.identity_id: unique among all rows
//! - Book (title, author, category) and Comment (book, author): unique among
//!   *active* rows only, since soft-deleting frees the slot
//! - Suggestion (book, proposer) and Report (target, reporter): unique among
//!   all rows

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use bk_core::error::{AppError, Result};
use bk_core::models::{Book, Comment, Identity, Profile, Report, ReviewState, Suggestion};
use bk_core::traits::{
    BookFilter, BookRepo, CommentRepo, IdentityRepo, ProfileRepo, Repos, ReportRepo,
    SuggestionRepo,
};
use bk_core::{StoreConnector, StoreHandle};

#[derive(Default)]
struct Tables {
    identities: RwLock<HashMap<Uuid, Identity>>,
    profiles: RwLock<HashMap<Uuid, Profile>>,
    books: RwLock<HashMap<Uuid, Book>>,
    comments: RwLock<HashMap<Uuid, Comment>>,
    suggestions: RwLock<HashMap<Uuid, Suggestion>>,
    reports: RwLock<HashMap<Uuid, Report>>,
}

// A poisoned lock means a writer panicked mid-update; the maps themselves
// are always structurally valid, so recover the guard rather than propagate.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// The shared in-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out one repository set over the shared tables.
    pub fn repos(&self) -> Repos {
        Repos {
            identities: Arc::new(MemoryIdentityRepo {
                tables: Arc::clone(&self.tables),
            }),
            profiles: Arc::new(MemoryProfileRepo {
                tables: Arc::clone(&self.tables),
            }),
            books: Arc::new(MemoryBookRepo {
                tables: Arc::clone(&self.tables),
            }),
            comments: Arc::new(MemoryCommentRepo {
                tables: Arc::clone(&self.tables),
            }),
            suggestions: Arc::new(MemorySuggestionRepo {
                tables: Arc::clone(&self.tables),
            }),
            reports: Arc::new(MemoryReportRepo {
                tables: Arc::clone(&self.tables),
            }),
        }
    }
}

/// `StoreConnector` over a `MemoryStore`, for wiring into a `StoreHandle`.
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> Result<Repos> {
        Ok(self.store.repos())
    }
}

/// Convenience for tests and the seed binary: a connected handle over a
/// fresh in-memory store.
pub fn memory_handle() -> Arc<StoreHandle> {
    let store = Arc::new(MemoryStore::new());
    Arc::new(StoreHandle::new(Arc::new(MemoryConnector::new(store))))
}

struct MemoryIdentityRepo {
    tables: Arc<Tables>,
}

#[async_trait]
impl IdentityRepo for MemoryIdentityRepo {
    async fn insert(&self, identity: Identity) -> Result<Identity> {
        let mut map = write(&self.tables.identities);
        if map.values().any(|i| i.handle == identity.handle) {
            return Err(AppError::Conflict(format!(
                "handle '{}' is already registered",
                identity.handle
            )));
        }
        map.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Identity>> {
        Ok(read(&self.tables.identities).get(&id).cloned())
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>> {
        Ok(read(&self.tables.identities)
            .values()
            .find(|i| i.handle == handle)
            .cloned())
    }

    async fn update_one(&self, identity: &Identity) -> Result<Identity> {
        let mut map = write(&self.tables.identities);
        if !map.contains_key(&identity.id) {
            return Err(AppError::not_found("Identity", identity.id));
        }
        map.insert(identity.id, identity.clone());
        Ok(identity.clone())
    }
}

struct MemoryProfileRepo {
    tables: Arc<Tables>,
}

#[async_trait]
impl ProfileRepo for MemoryProfileRepo {
    async fn insert(&self, profile: Profile) -> Result<Profile> {
        let mut map = write(&self.tables.profiles);
        if map.values().any(|p| p.identity_id == profile.identity_id) {
            return Err(AppError::Conflict(format!(
                "a profile already exists for identity {}",
                profile.identity_id
            )));
        }
        map.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(read(&self.tables.profiles).get(&id).cloned())
    }

    async fn find_by_identity(&self, identity_id: Uuid) -> Result<Option<Profile>> {
        Ok(read(&self.tables.profiles)
            .values()
            .find(|p| p.identity_id == identity_id)
            .cloned())
    }

    async fn find_many(&self) -> Result<Vec<Profile>> {
        Ok(read(&self.tables.profiles).values().cloned().collect())
    }

    async fn update_one(&self, profile: &Profile) -> Result<Profile> {
        let mut map = write(&self.tables.profiles);
        if !map.contains_key(&profile.id) {
            return Err(AppError::not_found("Profile", profile.id));
        }
        map.insert(profile.id, profile.clone());
        Ok(profile.clone())
    }
}

struct MemoryBookRepo {
    tables: Arc<Tables>,
}

fn book_key_taken(map: &HashMap<Uuid, Book>, book: &Book) -> bool {
    book.active
        && map.values().any(|b| {
            b.id != book.id
                && b.active
                && b.title == book.title
                && b.author == book.author
                && b.category == book.category
        })
}

#[async_trait]
impl BookRepo for MemoryBookRepo {
    async fn insert(&self, book: Book) -> Result<Book> {
        let mut map = write(&self.tables.books);
        if book_key_taken(&map, &book) {
            return Err(AppError::Conflict(format!(
                "an active book '{}' by {} already exists in {}",
                book.title, book.author, book.category
            )));
        }
        map.insert(book.id, book.clone());
        Ok(book)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Book>> {
        Ok(read(&self.tables.books).get(&id).cloned())
    }

    async fn find_many(&self, filter: BookFilter) -> Result<Vec<Book>> {
        Ok(read(&self.tables.books)
            .values()
            .filter(|b| !filter.active_only || b.active)
            .filter(|b| filter.review_state.is_none_or(|s| b.review_state == s))
            .filter(|b| filter.owner.is_none_or(|o| b.owner_profile_id == o))
            .cloned()
            .collect())
    }

    async fn update_one(&self, book: &Book) -> Result<Book> {
        let mut map = write(&self.tables.books);
        if !map.contains_key(&book.id) {
            return Err(AppError::not_found("Book", book.id));
        }
        if book_key_taken(&map, book) {
            return Err(AppError::Conflict(format!(
                "an active book '{}' by {} already exists in {}",
                book.title, book.author, book.category
            )));
        }
        map.insert(book.id, book.clone());
        Ok(book.clone())
    }

    async fn delete_one(&self, id: Uuid) -> Result<()> {
        write(&self.tables.books).remove(&id);
        Ok(())
    }
}

struct MemoryCommentRepo {
    tables: Arc<Tables>,
}

fn comment_key_taken(map: &HashMap<Uuid, Comment>, comment: &Comment) -> bool {
    comment.active
        && map.values().any(|c| {
            c.id != comment.id
                && c.active
                && c.book_id == comment.book_id
                && c.author_profile_id == comment.author_profile_id
        })
}

#[async_trait]
impl CommentRepo for MemoryCommentRepo {
    async fn insert(&self, comment: Comment) -> Result<Comment> {
        let mut map = write(&self.tables.comments);
        if comment_key_taken(&map, &comment) {
            return Err(AppError::Conflict(
                "an active review by this reader already exists for this book".to_string(),
            ));
        }
        map.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(read(&self.tables.comments).get(&id).cloned())
    }

    async fn find_by_book(&self, book_id: Uuid, active_only: bool) -> Result<Vec<Comment>> {
        Ok(read(&self.tables.comments)
            .values()
            .filter(|c| c.book_id == book_id && (!active_only || c.active))
            .cloned()
            .collect())
    }

    async fn find_by_author(
        &self,
        author_profile_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Comment>> {
        Ok(read(&self.tables.comments)
            .values()
            .filter(|c| c.author_profile_id == author_profile_id && (!active_only || c.active))
            .cloned()
            .collect())
    }

    async fn find_by_reply(&self, reply_id: Uuid) -> Result<Option<Comment>> {
        Ok(read(&self.tables.comments)
            .values()
            .find(|c| c.replies.iter().any(|r| r.id == reply_id))
            .cloned())
    }

    async fn update_one(&self, comment: &Comment) -> Result<Comment> {
        let mut map = write(&self.tables.comments);
        if !map.contains_key(&comment.id) {
            return Err(AppError::not_found("Comment", comment.id));
        }
        if comment_key_taken(&map, comment) {
            return Err(AppError::Conflict(
                "an active review by this reader already exists for this book".to_string(),
            ));
        }
        map.insert(comment.id, comment.clone());
        Ok(comment.clone())
    }

    async fn delete_one(&self, id: Uuid) -> Result<()> {
        write(&self.tables.comments).remove(&id);
        Ok(())
    }
}

struct MemorySuggestionRepo {
    tables: Arc<Tables>,
}

#[async_trait]
impl SuggestionRepo for MemorySuggestionRepo {
    async fn insert(&self, suggestion: Suggestion) -> Result<Suggestion> {
        let mut map = write(&self.tables.suggestions);
        if map.values().any(|s| {
            s.proposed_book_id == suggestion.proposed_book_id
                && s.proposer_profile_id == suggestion.proposer_profile_id
        }) {
            return Err(AppError::Conflict(
                "a suggestion for this book by this proposer already exists".to_string(),
            ));
        }
        map.insert(suggestion.id, suggestion.clone());
        Ok(suggestion)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Suggestion>> {
        Ok(read(&self.tables.suggestions).get(&id).cloned())
    }

    async fn find_many(&self, state: Option<ReviewState>) -> Result<Vec<Suggestion>> {
        Ok(read(&self.tables.suggestions)
            .values()
            .filter(|s| state.is_none_or(|wanted| s.review_state == wanted))
            .cloned()
            .collect())
    }

    async fn update_one(&self, suggestion: &Suggestion) -> Result<Suggestion> {
        let mut map = write(&self.tables.suggestions);
        if !map.contains_key(&suggestion.id) {
            return Err(AppError::not_found("Suggestion", suggestion.id));
        }
        map.insert(suggestion.id, suggestion.clone());
        Ok(suggestion.clone())
    }

    async fn delete_one(&self, id: Uuid) -> Result<()> {
        write(&self.tables.suggestions).remove(&id);
        Ok(())
    }
}

struct MemoryReportRepo {
    tables: Arc<Tables>,
}

#[async_trait]
impl ReportRepo for MemoryReportRepo {
    async fn insert(&self, report: Report) -> Result<Report> {
        let mut map = write(&self.tables.reports);
        if map.values().any(|r| {
            r.target == report.target && r.reporter_profile_id == report.reporter_profile_id
        }) {
            return Err(AppError::Conflict(
                "this reporter has already reported that target".to_string(),
            ));
        }
        map.insert(report.id, report.clone());
        Ok(report)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(read(&self.tables.reports).get(&id).cloned())
    }

    async fn find_many(&self, active_only: bool) -> Result<Vec<Report>> {
        Ok(read(&self.tables.reports)
            .values()
            .filter(|r| !active_only || r.active)
            .cloned()
            .collect())
    }

    async fn update_one(&self, report: &Report) -> Result<Report> {
        let mut map = write(&self.tables.reports);
        if !map.contains_key(&report.id) {
            return Err(AppError::not_found("Report", report.id));
        }
        map.insert(report.id, report.clone());
        Ok(report.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_core::models::{ReportTarget, Reply};
    use chrono::Utc;

    fn sample_book(owner: Uuid) -> Book {
        Book {
            id: Uuid::now_v7(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            category: "sci-fi".to_string(),
            year: 1965,
            isbn: None,
            synopsis: None,
            cover_image: None,
            file_path: None,
            owner_profile_id: owner,
            active: true,
            review_state: ReviewState::Approved,
            aggregate_rating: 0.0,
            comment_ids: vec![],
            created_at: Utc::now(),
        }
    }

    fn sample_comment(book_id: Uuid, author: Uuid) -> Comment {
        Comment {
            id: Uuid::now_v7(),
            book_id,
            author_profile_id: author,
            body: "a classic".to_string(),
            stars: 5,
            active: true,
            created_at: Utc::now(),
            replies: vec![],
            report_ids: vec![],
        }
    }

    #[tokio::test]
    async fn duplicate_active_comment_conflicts_until_retracted() {
        let repos = MemoryStore::new().repos();
        let book_id = Uuid::now_v7();
        let author = Uuid::now_v7();

        let first = repos
            .comments
            .insert(sample_comment(book_id, author))
            .await
            .unwrap();
        let err = repos
            .comments
            .insert(sample_comment(book_id, author))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Retraction frees the (book, author) slot.
        let mut retracted = first.clone();
        retracted.active = false;
        repos.comments.update_one(&retracted).await.unwrap();
        repos
            .comments
            .insert(sample_comment(book_id, author))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_duplicate_inserts_yield_one_success() {
        let repos = MemoryStore::new().repos();
        let book_id = Uuid::now_v7();
        let author = Uuid::now_v7();

        let a = repos.comments.clone();
        let b = repos.comments.clone();
        let t1 = tokio::spawn({
            let comment = sample_comment(book_id, author);
            async move { a.insert(comment).await }
        });
        let t2 = tokio::spawn({
            let comment = sample_comment(book_id, author);
            async move { b.insert(comment).await }
        });

        let results = [t1.await.unwrap(), t2.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn book_triple_unique_among_active_only() {
        let repos = MemoryStore::new().repos();
        let owner = Uuid::now_v7();

        let first = repos.books.insert(sample_book(owner)).await.unwrap();
        let err = repos.books.insert(sample_book(owner)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let mut retired = first.clone();
        retired.active = false;
        repos.books.update_one(&retired).await.unwrap();
        repos.books.insert(sample_book(owner)).await.unwrap();
    }

    #[tokio::test]
    async fn find_by_reply_resolves_owning_comment() {
        let repos = MemoryStore::new().repos();
        let mut comment = sample_comment(Uuid::now_v7(), Uuid::now_v7());
        let reply_id = Uuid::now_v7();
        comment.replies.push(Reply {
            id: reply_id,
            author_profile_id: Uuid::now_v7(),
            body: "agreed".to_string(),
            active: true,
            created_at: Utc::now(),
            report_ids: vec![],
        });
        let comment = repos.comments.insert(comment).await.unwrap();

        let found = repos.comments.find_by_reply(reply_id).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(comment.id));
        assert!(repos
            .comments
            .find_by_reply(Uuid::now_v7())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_report_conflicts_regardless_of_resolution() {
        let repos = MemoryStore::new().repos();
        let target = ReportTarget::Comment(Uuid::now_v7());
        let reporter = Uuid::now_v7();
        let report = Report {
            id: Uuid::now_v7(),
            target,
            reporter_profile_id: reporter,
            reason: "spam".to_string(),
            active: true,
            created_at: Utc::now(),
        };
        repos.reports.insert(report.clone()).await.unwrap();

        let mut dup = report;
        dup.id = Uuid::now_v7();
        let err = repos.reports.insert(dup).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn connector_hands_out_shared_tables() {
        let store = Arc::new(MemoryStore::new());
        let handle = StoreHandle::new(Arc::new(MemoryConnector::new(store)));
        let repos = handle.repos().await.unwrap();
        let book = repos.books.insert(sample_book(Uuid::now_v7())).await.unwrap();

        // A second repos() call sees the same data.
        let again = handle.repos().await.unwrap();
        assert!(again.books.find_one(book.id).await.unwrap().is_some());
    }
}
