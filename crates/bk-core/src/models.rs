//! # Domain Models
//!
//! These structs represent the core entities of Bookery.
//! We use UUID v7 for time-ordered, globally unique identification.
//!
//! Soft-delete convention: every top-level entity carries an `active` flag;
//! rows are never physically removed outside of compensating deletes, and
//! every list/find path must compose an explicit active filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest reply body accepted, in characters.
pub const MAX_REPLY_LEN: usize = 500;

/// Account role. Moderation capabilities (suggestion decisions) require `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

/// Approval lifecycle shared by Book and Suggestion.
/// `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
    Pending,
    Approved,
    Rejected,
}

impl ReviewState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReviewState::Pending)
    }
}

/// Credential + role record. Never hard-deleted; disabling flips `enabled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    /// Login handle (unique across identities)
    pub handle: String,
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
}

/// Public per-identity record: display fields, saved books, counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Owning identity (1:1, unique)
    pub identity_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub program: String,
    pub bio: String,
    /// Ordered, duplicate-free list of saved Book ids
    pub saved_book_ids: Vec<Uuid>,
    pub suggestion_count: u32,
    pub helpful_review_count: u32,
    pub enabled: bool,
}

/// Canonical record for a book, its approval state, and its aggregate rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub category: String,
    pub year: i32,
    pub isbn: Option<String>,
    pub synopsis: Option<String>,
    pub cover_image: Option<String>,
    pub file_path: Option<String>,
    pub owner_profile_id: Uuid,
    pub active: bool,
    pub review_state: ReviewState,
    /// Mean star value across this book's active comments; 0 when none exist.
    /// Recomputed fresh on every comment write that changes the active set.
    pub aggregate_rating: f64,
    /// Historical linkage: retracted comments stay listed here.
    pub comment_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// The only state combination visible to ordinary readers.
    pub fn is_public(&self) -> bool {
        self.active && self.review_state == ReviewState::Approved
    }
}

/// A reply nested under a Comment. Owned inline: replies have no lifecycle
/// outside their parent and are never addressable across collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    #[serde(rename = "id_persona")]
    pub author_profile_id: Uuid,
    pub body: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub report_ids: Vec<Uuid>,
}

/// A star review on a book. At most one active comment per
/// (book, reviewer) pair; the store enforces this at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    #[serde(rename = "id_libro")]
    pub book_id: Uuid,
    #[serde(rename = "id_persona")]
    pub author_profile_id: Uuid,
    pub body: String,
    /// Star rating in [1, 5]
    pub stars: u8,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Append-only; "deleting" a reply only flips its `active` flag.
    pub replies: Vec<Reply>,
    pub report_ids: Vec<Uuid>,
}

impl Comment {
    /// The replies a reader sees; inactive ones stay in storage.
    pub fn active_replies(&self) -> impl Iterator<Item = &Reply> {
        self.replies.iter().filter(|r| r.active)
    }
}

/// A proposal to add a new book, pending moderator approval.
/// Its `review_state` tracks the proposed Book's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    #[serde(rename = "id_libro")]
    pub proposed_book_id: Uuid,
    #[serde(rename = "id_persona")]
    pub proposer_profile_id: Uuid,
    pub initial_comment: String,
    pub review_state: ReviewState,
    pub active: bool,
    /// Discussion comments attached to the proposal
    pub comment_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// What a report points at. Reply targets resolve through their owning
/// comment since replies are not independently addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ReportTarget {
    Comment(Uuid),
    Reply(Uuid),
}

impl ReportTarget {
    pub fn id(&self) -> Uuid {
        match self {
            ReportTarget::Comment(id) | ReportTarget::Reply(id) => *id,
        }
    }
}

/// An abuse flag raised against a comment or reply.
/// One report per (target, reporter) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub target: ReportTarget,
    pub reporter_profile_id: Uuid,
    pub reason: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller, as resolved by the Auth Gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Actor {
    pub identity_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn is_moderator(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_wire_names_match_legacy_contract() {
        let comment = Comment {
            id: Uuid::now_v7(),
            book_id: Uuid::now_v7(),
            author_profile_id: Uuid::now_v7(),
            body: "solid reference text".to_string(),
            stars: 4,
            active: true,
            created_at: Utc::now(),
            replies: vec![],
            report_ids: vec![],
        };
        let json = serde_json::to_value(&comment).unwrap();
        assert!(json.get("id_libro").is_some());
        assert!(json.get("id_persona").is_some());
        assert!(json.get("book_id").is_none());
    }

    #[test]
    fn review_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ReviewState::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&ReviewState::Approved).unwrap(),
            "\"approved\""
        );
        assert!(ReviewState::Rejected.is_terminal());
        assert!(!ReviewState::Pending.is_terminal());
    }

    #[test]
    fn active_replies_filters_retracted() {
        let mut comment = Comment {
            id: Uuid::now_v7(),
            book_id: Uuid::now_v7(),
            author_profile_id: Uuid::now_v7(),
            body: "ok".to_string(),
            stars: 3,
            active: true,
            created_at: Utc::now(),
            replies: vec![],
            report_ids: vec![],
        };
        for active in [true, false, true] {
            comment.replies.push(Reply {
                id: Uuid::now_v7(),
                author_profile_id: Uuid::now_v7(),
                body: "reply".to_string(),
                active,
                created_at: Utc::now(),
                report_ids: vec![],
            });
        }
        assert_eq!(comment.active_replies().count(), 2);
        assert_eq!(comment.replies.len(), 3);
    }
}
