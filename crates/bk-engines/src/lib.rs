//! bookery/crates/bk-engines/src/lib.rs
//!
//! The review-and-moderation consistency core, plus the catalog and profile
//! services around it. Engines receive a shared `StoreHandle` by constructor
//! injection and return typed `AppError`s; they never panic across the
//! engine/transport boundary.

pub mod catalog;
pub mod moderation;
pub mod profile;
pub mod rating;
pub mod review;

pub use catalog::{BookDraft, BookPatch, CatalogService};
pub use moderation::{Decision, ModerationEngine, SuggestionDetail};
pub use profile::{ProfileDraft, ProfilePatch, ProfileService, ProfileView};
pub use review::{ReviewEngine, ReviewPatch};
