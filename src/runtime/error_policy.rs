//! # Error Policy
//!
//! Classification of watch stream errors.
//!
//! The watcher restarts itself with backoff; this module only decides how loud
//! a failure is and counts it.

use crate::observability::metrics;
use tracing::{error, warn};

/// Watch failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version expired, normal after restarts
    Expired,
    /// 429: API server throttling or storage reinitializing
    Throttled,
    /// 404: CRD missing
    NotFound,
    Other,
}

/// Classify a watch error from its rendered form
///
/// 404 is checked before 401: a plain-text 404 body surfaces as a decode error
/// whose chain mentions the watch failure.
pub fn classify_watch_error(error_string: &str) -> WatchErrorClass {
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if is_not_found {
        return WatchErrorClass::NotFound;
    }
    if error_string.contains("401") || error_string.contains("Unauthorized") {
        return WatchErrorClass::Unauthorized;
    }
    if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        return WatchErrorClass::Expired;
    }
    if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        return WatchErrorClass::Throttled;
    }
    WatchErrorClass::Other
}

/// Log and count a watch stream error for `kind`
pub fn handle_watch_stream_error(kind: &str, error: &impl std::fmt::Debug) -> WatchErrorClass {
    let error_string = format!("{error:?}");
    let class = classify_watch_error(&error_string);
    metrics::increment_watch_errors(kind);

    match class {
        WatchErrorClass::Unauthorized => {
            error!(
                "❌ {} watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired",
                kind
            );
            error!("   Verify the operator ClusterRole still grants list/watch on {} and secrets", kind);
        }
        WatchErrorClass::Expired => {
            warn!(
                "{} watch resource version expired (410) - this is normal during restarts, watch will restart",
                kind
            );
        }
        WatchErrorClass::Throttled => {
            warn!("API server throttling {} watch (429), backing off", kind);
        }
        WatchErrorClass::NotFound => {
            warn!(
                "{} watch returned 404 - is the CRD installed? (crdgen --kind {} | kubectl apply -f -)",
                kind, kind
            );
        }
        WatchErrorClass::Other => {
            error!("{} watch stream error: {}", kind, error_string);
        }
    }
    class
}
