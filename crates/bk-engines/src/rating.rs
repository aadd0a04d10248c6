//! Aggregate-rating helper shared by the review and catalog paths.

use bk_core::models::Comment;

/// Arithmetic mean of `stars` over the active subset of `comments`;
/// 0 when the active set is empty.
///
/// Callers recompute this fresh from a read of the full comment set rather
/// than maintaining a running sum, so a crash or concurrent retraction
/// between two writers converges on the next recomputation instead of
/// accumulating drift.
pub fn mean_stars(comments: &[Comment]) -> f64 {
    let mut sum = 0u32;
    let mut count = 0u32;
    for comment in comments.iter().filter(|c| c.active) {
        sum += u32::from(comment.stars);
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        f64::from(sum) / f64::from(count)
    }
}
