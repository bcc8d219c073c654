//! Logical-path to wire-path version resolution.

use crate::error::{ApiError, ApiResult};
use std::collections::HashMap;

/// Map a logical path and a version tag to a concrete wire path.
///
/// Pure and total: the logical path is normalized to a single leading
/// separator, then prefixed with the version tag segment.
pub fn resolve(path: &str, version: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    format!("/{version}/{trimmed}")
}

/// Select a version-specific implementation by exact match, falling back to
/// a default when provided.
///
/// Used by modules that branch behavior across API versions; the pipeline
/// itself never calls this. An unhandled version with no fallback is a
/// configuration error.
pub fn dispatch_by_version<T>(
    version: &str,
    mut handlers: HashMap<&str, T>,
    fallback: Option<T>,
) -> ApiResult<T> {
    if let Some(handler) = handlers.remove(version) {
        return Ok(handler);
    }
    fallback.ok_or_else(|| {
        ApiError::configuration(format!("no handler registered for API version '{version}'"))
    })
}
