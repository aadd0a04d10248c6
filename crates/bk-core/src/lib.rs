//! bookery/crates/bk-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Bookery.

pub mod envelope;
pub mod error;
pub mod handle;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use envelope::{envelope_created, envelope_ok, ApiResponse};
pub use error::*;
pub use handle::{RetryPolicy, StoreConnector, StoreHandle};
pub use models::*;
pub use traits::*;
