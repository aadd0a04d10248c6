//! # Profile Service
//!
//! Per-identity public records: registration (with lazy identity creation),
//! display-field updates with role/enabled write-through to the Identity
//! row, and the saved-books list.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bk_core::error::{AppError, Result};
use bk_core::models::{Book, Identity, Profile, Role};
use bk_core::traits::{CredentialHasher, Repos};
use bk_core::StoreHandle;

const DEFAULT_BIO: &str = "New to the shelf";

/// Registration fields. The handle doubles as the initial password for
/// lazily-created identities; members change it at first login.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDraft {
    pub handle: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub program: String,
}

impl ProfileDraft {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("handle", &self.handle),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("program", &self.program),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// Partial update. `role` and `enabled` write through to the Identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub program: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
    pub enabled: Option<bool>,
}

/// A profile joined with its identity's current role and enabled flag.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub profile: Profile,
    pub role: Role,
    pub enabled: bool,
}

pub struct ProfileService {
    db: Arc<StoreHandle>,
    hasher: Arc<dyn CredentialHasher>,
}

impl ProfileService {
    pub fn new(db: Arc<StoreHandle>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { db, hasher }
    }

    /// Creates a profile, lazily creating a member identity when the handle
    /// is unknown. Exactly one profile per identity.
    pub async fn register_profile(&self, draft: ProfileDraft) -> Result<ProfileView> {
        draft.validate()?;
        let repos = self.db.repos().await?;
        let handle = draft.handle.trim();

        let identity = match repos.identities.find_by_handle(handle).await? {
            Some(identity) => identity,
            None => {
                repos
                    .identities
                    .insert(Identity {
                        id: Uuid::now_v7(),
                        handle: handle.to_string(),
                        password_hash: self.hasher.hash_password(handle)?,
                        role: Role::Member,
                        enabled: true,
                    })
                    .await?
            }
        };

        let profile = repos
            .profiles
            .insert(Profile {
                id: Uuid::now_v7(),
                identity_id: identity.id,
                first_name: draft.first_name.trim().to_string(),
                last_name: draft.last_name.trim().to_string(),
                email: draft.email.trim().to_string(),
                program: draft.program.trim().to_string(),
                bio: DEFAULT_BIO.to_string(),
                saved_book_ids: vec![],
                suggestion_count: 0,
                helpful_review_count: 0,
                enabled: true,
            })
            .await?;

        tracing::info!(profile_id = %profile.id, identity_id = %identity.id, "profile registered");
        Ok(ProfileView {
            profile,
            role: identity.role,
            enabled: identity.enabled,
        })
    }

    /// The profile owned by an identity, with its current role.
    pub async fn get_profile(&self, identity_id: Uuid) -> Result<ProfileView> {
        let repos = self.db.repos().await?;
        let profile = repos
            .profiles
            .find_by_identity(identity_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", identity_id))?;
        let identity = self.identity_of(&repos, &profile).await?;
        Ok(ProfileView {
            profile,
            role: identity.role,
            enabled: identity.enabled,
        })
    }

    /// Every profile with role/enabled joined in. Rows whose identity is
    /// missing indicate a broken link; they are logged and skipped.
    pub async fn list_profiles(&self) -> Result<Vec<ProfileView>> {
        let repos = self.db.repos().await?;
        let mut profiles = repos.profiles.find_many().await?;
        profiles.sort_by(|a, b| a.last_name.cmp(&b.last_name));

        let mut views = Vec::with_capacity(profiles.len());
        for profile in profiles {
            match repos.identities.find_one(profile.identity_id).await? {
                Some(identity) => views.push(ProfileView {
                    profile,
                    role: identity.role,
                    enabled: identity.enabled,
                }),
                None => {
                    tracing::warn!(profile_id = %profile.id, "profile without identity skipped");
                }
            }
        }
        Ok(views)
    }

    /// Display fields land on the Profile; role/enabled changes write
    /// through to the Identity so the Auth Gate sees them immediately.
    pub async fn update_profile(&self, profile_id: Uuid, patch: ProfilePatch) -> Result<ProfileView> {
        let repos = self.db.repos().await?;
        let mut profile = repos
            .profiles
            .find_one(profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", profile_id))?;
        let mut identity = self.identity_of(&repos, &profile).await?;

        if let Some(first_name) = patch.first_name {
            profile.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            profile.last_name = last_name;
        }
        if let Some(email) = patch.email {
            profile.email = email;
        }
        if let Some(program) = patch.program {
            profile.program = program;
        }
        if let Some(bio) = patch.bio {
            profile.bio = bio;
        }

        if patch.role.is_some() || patch.enabled.is_some() {
            if let Some(role) = patch.role {
                identity.role = role;
            }
            if let Some(enabled) = patch.enabled {
                identity.enabled = enabled;
                profile.enabled = enabled;
            }
            repos.identities.update_one(&identity).await?;
        }

        let profile = repos.profiles.update_one(&profile).await?;
        Ok(ProfileView {
            profile,
            role: identity.role,
            enabled: identity.enabled,
        })
    }

    /// Disables the profile and its identity; existing sessions stop
    /// verifying at the Auth Gate.
    pub async fn deactivate_profile(&self, profile_id: Uuid) -> Result<()> {
        let repos = self.db.repos().await?;
        let mut profile = repos
            .profiles
            .find_one(profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", profile_id))?;
        let mut identity = self.identity_of(&repos, &profile).await?;

        identity.enabled = false;
        repos.identities.update_one(&identity).await?;
        profile.enabled = false;
        repos.profiles.update_one(&profile).await?;
        tracing::info!(profile_id = %profile_id, "profile deactivated");
        Ok(())
    }

    /// Adds a book to the saved list. Duplicate saves conflict; order is
    /// preserved.
    pub async fn save_book(&self, profile_id: Uuid, book_id: Uuid) -> Result<Profile> {
        let repos = self.db.repos().await?;
        let mut profile = repos
            .profiles
            .find_one(profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", profile_id))?;
        repos
            .books
            .find_one(book_id)
            .await?
            .filter(|b| b.active)
            .ok_or_else(|| AppError::not_found("Book", book_id))?;

        if profile.saved_book_ids.contains(&book_id) {
            return Err(AppError::Conflict("book is already saved".to_string()));
        }
        profile.saved_book_ids.push(book_id);
        repos.profiles.update_one(&profile).await
    }

    /// Removes a book from the saved list; absent ids read as not found.
    pub async fn unsave_book(&self, profile_id: Uuid, book_id: Uuid) -> Result<Profile> {
        let repos = self.db.repos().await?;
        let mut profile = repos
            .profiles
            .find_one(profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", profile_id))?;

        let position = profile
            .saved_book_ids
            .iter()
            .position(|id| *id == book_id)
            .ok_or_else(|| AppError::not_found("Saved book", book_id))?;
        profile.saved_book_ids.remove(position);
        repos.profiles.update_one(&profile).await
    }

    /// The saved list, populated and narrowed to what the reader may see:
    /// approved & active books only.
    pub async fn saved_books(&self, profile_id: Uuid) -> Result<Vec<Book>> {
        let repos = self.db.repos().await?;
        let profile = repos
            .profiles
            .find_one(profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", profile_id))?;

        let mut books = Vec::with_capacity(profile.saved_book_ids.len());
        for book_id in &profile.saved_book_ids {
            if let Some(book) = repos
                .books
                .find_one(*book_id)
                .await?
                .filter(Book::is_public)
            {
                books.push(book);
            }
        }
        Ok(books)
    }

    async fn identity_of(&self, repos: &Repos, profile: &Profile) -> Result<Identity> {
        repos
            .identities
            .find_one(profile.identity_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "identity {} missing for profile {}",
                    profile.identity_id, profile.id
                ))
            })
    }
}
