//! Shared fixtures: a fully wired `AppState` over a fresh in-memory store.
#![allow(dead_code)]

use std::sync::Arc;

use bk_api::AppState;
use bk_auth_jwt::{Argon2CredentialHasher, JwtAuthService};
use bk_core::models::Role;
use bk_core::StoreHandle;
use bk_engines::{
    BookDraft, CatalogService, ModerationEngine, ProfileDraft, ProfileService, ProfileView,
    ReviewEngine,
};
use bk_store_memory::memory_handle;

pub const JWT_SECRET: &str = "integration-secret";

pub fn app_state() -> (Arc<StoreHandle>, AppState) {
    let handle = memory_handle();
    let state = AppState {
        reviews: ReviewEngine::new(Arc::clone(&handle)),
        moderation: ModerationEngine::new(Arc::clone(&handle)),
        catalog: CatalogService::new(Arc::clone(&handle)),
        profiles: ProfileService::new(Arc::clone(&handle), Arc::new(Argon2CredentialHasher)),
        auth: Arc::new(JwtAuthService::new(Arc::clone(&handle), JWT_SECRET)),
    };
    (handle, state)
}

pub fn auth_service(handle: &Arc<StoreHandle>) -> JwtAuthService {
    JwtAuthService::new(Arc::clone(handle), JWT_SECRET)
}

/// Registers a member profile through the service, identity created lazily.
pub async fn member(state: &AppState, handle: &str) -> ProfileView {
    state
        .profiles
        .register_profile(ProfileDraft {
            handle: handle.to_string(),
            first_name: "Test".to_string(),
            last_name: handle.to_string(),
            email: format!("{handle}@example.edu"),
            program: "letters".to_string(),
        })
        .await
        .expect("profile registration failed")
}

/// Registers an admin identity plus its profile.
pub async fn moderator(
    handle_ref: &Arc<StoreHandle>,
    state: &AppState,
    handle: &str,
) -> ProfileView {
    auth_service(handle_ref)
        .register(handle, "moderator-pw", Role::Admin)
        .await
        .expect("admin registration failed");
    member(state, handle).await
}

pub fn book_draft(title: &str) -> BookDraft {
    BookDraft {
        title: title.to_string(),
        author: "Ursula K. Le Guin".to_string(),
        category: "sci-fi".to_string(),
        year: 1969,
        isbn: None,
        synopsis: None,
        cover_image: None,
        file_path: None,
    }
}
