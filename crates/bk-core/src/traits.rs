//! # Core Traits (Ports)
//!
//! Any storage or auth plugin must implement these traits to be used by the
//! engines. Repository methods mirror the generic CRUD verbs the persistence
//! layer offers (insert / find_one / find_many / update_one / delete_one);
//! uniqueness constraints are enforced by the implementation at write time
//! and surface as `AppError::Conflict`.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Actor, Book, Comment, Identity, Profile, Report, ReviewState, Suggestion,
};

/// Filter for book queries. `Default` matches everything, soft-deleted rows
/// included; callers compose the active filter explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookFilter {
    pub review_state: Option<ReviewState>,
    pub owner: Option<Uuid>,
    pub active_only: bool,
}

/// Credential records. Identities are never hard-deleted.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityRepo: Send + Sync {
    /// Unique on `handle`.
    async fn insert(&self, identity: Identity) -> Result<Identity>;
    async fn find_one(&self, id: Uuid) -> Result<Option<Identity>>;
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>>;
    async fn update_one(&self, identity: &Identity) -> Result<Identity>;
}

/// Public per-identity records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileRepo: Send + Sync {
    /// Unique on `identity_id`.
    async fn insert(&self, profile: Profile) -> Result<Profile>;
    async fn find_one(&self, id: Uuid) -> Result<Option<Profile>>;
    async fn find_by_identity(&self, identity_id: Uuid) -> Result<Option<Profile>>;
    async fn find_many(&self) -> Result<Vec<Profile>>;
    async fn update_one(&self, profile: &Profile) -> Result<Profile>;
}

/// Book catalog records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BookRepo: Send + Sync {
    /// Unique on (title, author, category) among active books.
    async fn insert(&self, book: Book) -> Result<Book>;
    async fn find_one(&self, id: Uuid) -> Result<Option<Book>>;
    async fn find_many(&self, filter: BookFilter) -> Result<Vec<Book>>;
    async fn update_one(&self, book: &Book) -> Result<Book>;
    /// Hard delete. Reserved for compensating rollbacks; idempotent.
    async fn delete_one(&self, id: Uuid) -> Result<()>;
}

/// Star reviews, with their embedded replies.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Unique on (book_id, author_profile_id) among active comments.
    async fn insert(&self, comment: Comment) -> Result<Comment>;
    async fn find_one(&self, id: Uuid) -> Result<Option<Comment>>;
    async fn find_by_book(&self, book_id: Uuid, active_only: bool) -> Result<Vec<Comment>>;
    async fn find_by_author(&self, author_profile_id: Uuid, active_only: bool)
        -> Result<Vec<Comment>>;
    /// Resolves the comment owning the given embedded reply, if any.
    async fn find_by_reply(&self, reply_id: Uuid) -> Result<Option<Comment>>;
    async fn update_one(&self, comment: &Comment) -> Result<Comment>;
    /// Hard delete. Reserved for compensating rollbacks; idempotent.
    async fn delete_one(&self, id: Uuid) -> Result<()>;
}

/// New-book proposals.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SuggestionRepo: Send + Sync {
    /// Unique on (proposed_book_id, proposer_profile_id).
    async fn insert(&self, suggestion: Suggestion) -> Result<Suggestion>;
    async fn find_one(&self, id: Uuid) -> Result<Option<Suggestion>>;
    /// No implicit active filter: moderators review the full history.
    async fn find_many(&self, state: Option<ReviewState>) -> Result<Vec<Suggestion>>;
    async fn update_one(&self, suggestion: &Suggestion) -> Result<Suggestion>;
    /// Hard delete. Reserved for compensating rollbacks; idempotent.
    async fn delete_one(&self, id: Uuid) -> Result<()>;
}

/// Abuse flags on comments and replies.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReportRepo: Send + Sync {
    /// Unique on (target, reporter_profile_id).
    async fn insert(&self, report: Report) -> Result<Report>;
    async fn find_one(&self, id: Uuid) -> Result<Option<Report>>;
    async fn find_many(&self, active_only: bool) -> Result<Vec<Report>>;
    async fn update_one(&self, report: &Report) -> Result<Report>;
}

/// Session validation, consumed from the Auth Gate.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthGate: Send + Sync {
    /// Resolves a session token to the acting identity and its current role.
    async fn verify_actor(&self, token: &str) -> Result<Actor>;
}

/// Password hashing seam, so engines stay crypto-free and tests stay fast.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    fn hash_password(&self, raw: &str) -> Result<String>;
    fn verify_password(&self, raw: &str, hash: &str) -> bool;
}

/// The full set of repositories a connected store exposes.
/// Cloning is cheap (shared trait objects).
#[derive(Clone)]
pub struct Repos {
    pub identities: Arc<dyn IdentityRepo>,
    pub profiles: Arc<dyn ProfileRepo>,
    pub books: Arc<dyn BookRepo>,
    pub comments: Arc<dyn CommentRepo>,
    pub suggestions: Arc<dyn SuggestionRepo>,
    pub reports: Arc<dyn ReportRepo>,
}

impl std::fmt::Debug for Repos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repos").finish_non_exhaustive()
    }
}
