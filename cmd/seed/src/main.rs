//! # Seed
//!
//! The composition root for local runs: assembles the in-memory backend,
//! the engines, and the Auth Gate, then walks a small demo corpus through
//! the full review-and-moderation flow. A transport binary would wire the
//! same `AppState` and mount `bk_api::handlers` under its routes.

use std::sync::Arc;

use anyhow::Context;
use bk_api::{handlers, AppState};
use bk_auth_jwt::{Argon2CredentialHasher, JwtAuthService};
use bk_core::models::Role;
use bk_core::StoreHandle;
use bk_engines::{
    BookDraft, CatalogService, ModerationEngine, ProfileDraft, ProfileService, ReviewEngine,
};
use bk_store_memory::{MemoryConnector, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let jwt_secret =
        std::env::var("BOOKERY_JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string());

    // 1. Persistence: shared handle, lazily connected, detached reconnect.
    let store = Arc::new(MemoryStore::new());
    let handle = Arc::new(StoreHandle::new(Arc::new(MemoryConnector::new(store))));
    handle.spawn_reconnect();

    // 2. Auth Gate and engines over the same handle.
    let auth = Arc::new(JwtAuthService::new(Arc::clone(&handle), jwt_secret));
    let state = AppState {
        reviews: ReviewEngine::new(Arc::clone(&handle)),
        moderation: ModerationEngine::new(Arc::clone(&handle)),
        catalog: CatalogService::new(Arc::clone(&handle)),
        profiles: ProfileService::new(Arc::clone(&handle), Arc::new(Argon2CredentialHasher)),
        auth: Arc::clone(&auth) as Arc<dyn bk_core::AuthGate>,
    };

    tracing::info!("🚀 Bookery seed starting");

    // 3. People: one moderator, two readers.
    auth.register("librarian", "change-me", Role::Admin)
        .await
        .context("registering moderator identity")?;
    let librarian = state
        .profiles
        .register_profile(profile_draft("librarian", "Iris", "Moreno"))
        .await?;
    let ada = state
        .profiles
        .register_profile(profile_draft("s2043", "Ada", "Quispe"))
        .await?;
    let ben = state
        .profiles
        .register_profile(profile_draft("s2044", "Ben", "Torres"))
        .await?;

    // 4. Catalog: a direct add plus a member proposal the moderator approves.
    let book = handlers::add_book(
        &state,
        librarian.profile.id,
        book_draft("The Dispossessed", "Ursula K. Le Guin", 1974),
    )
    .await;
    print_envelope("add_book", &book)?;
    let book_id = data_id(&book)?;

    let proposal = handlers::propose_book(
        &state,
        handlers::Proposal {
            proposer_id: ada.profile.id,
            book: book_draft("Solaris", "Stanisław Lem", 1961),
            initial_comment: "we have nothing by Lem yet".to_string(),
        },
    )
    .await;
    print_envelope("propose_book", &proposal)?;
    let suggestion_id = data_id(&proposal)?;

    let session = auth.login("librarian", "change-me").await?;
    let decision =
        handlers::decide_suggestion(&state, &session.token, suggestion_id, "approve").await;
    print_envelope("decide_suggestion", &decision)?;

    // 5. Reviews: two stars apart, then one retraction.
    let review = handlers::submit_review(
        &state,
        handlers::NewReview {
            book_id,
            reviewer_id: ada.profile.id,
            body: "an ambiguous utopia, and it earns the subtitle".to_string(),
            stars: 4,
        },
    )
    .await;
    print_envelope("submit_review", &review)?;
    let review_id = data_id(&review)?;

    print_envelope(
        "submit_review",
        &handlers::submit_review(
            &state,
            handlers::NewReview {
                book_id,
                reviewer_id: ben.profile.id,
                body: "slow in the middle stretch".to_string(),
                stars: 2,
            },
        )
        .await,
    )?;

    print_envelope(
        "add_reply",
        &handlers::add_reply(
            &state,
            review_id,
            handlers::NewReply {
                author_id: ben.profile.id,
                body: "the Anarres chapters carry it".to_string(),
            },
        )
        .await,
    )?;

    print_envelope("retract_review", &handlers::retract_review(&state, review_id).await)?;

    // 6. Reader-facing views.
    print_envelope("top_rated", &handlers::top_rated_books(&state, 5).await)?;
    print_envelope("list_books", &handlers::list_books(&state).await)?;
    print_envelope("save_book", &handlers::save_book(&state, ada.profile.id, book_id).await)?;
    print_envelope("saved_books", &handlers::saved_books(&state, ada.profile.id).await)?;

    tracing::info!("seed complete");
    Ok(())
}

fn profile_draft(handle: &str, first: &str, last: &str) -> ProfileDraft {
    ProfileDraft {
        handle: handle.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{handle}@example.edu"),
        program: "letters".to_string(),
    }
}

fn book_draft(title: &str, author: &str, year: i32) -> BookDraft {
    BookDraft {
        title: title.to_string(),
        author: author.to_string(),
        category: "sci-fi".to_string(),
        year,
        isbn: None,
        synopsis: None,
        cover_image: None,
        file_path: None,
    }
}

fn print_envelope(op: &str, resp: &bk_core::ApiResponse) -> anyhow::Result<()> {
    println!("── {op}\n{}", serde_json::to_string_pretty(resp)?);
    Ok(())
}

fn data_id(resp: &bk_core::ApiResponse) -> anyhow::Result<uuid::Uuid> {
    let id = resp
        .data
        .as_ref()
        .and_then(|d| d.get("id"))
        .and_then(|v| v.as_str())
        .context("envelope data carries no id")?;
    Ok(id.parse()?)
}
