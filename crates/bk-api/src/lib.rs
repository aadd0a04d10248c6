//! # bk-api
//!
//! The operation facade for Bookery: one function per engine operation,
//! validated primitive inputs in, a uniform `ApiResponse` envelope out.
//!
//! # Developer Note
//! HTTP routing and parameter parsing live outside this workspace; a
//! transport mounts these functions under whatever paths it likes and
//! serializes the envelope as-is. Keeping the facade transport-free means
//! the whole surface is exercisable from plain async tests.

pub mod handlers;

pub use handlers::AppState;
