//! # Configuration
//!
//! Operator-level settings loaded from environment variables.
//!
//! Environment variables are populated from a ConfigMap using `envFrom` in the deployment.

mod controller;
mod server;

pub use controller::{ControllerConfig, LogFormat};
pub use server::ServerConfig;

/// Read a value through `lookup` or return the default value
pub(crate) fn var_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a value through `lookup` as boolean or return the default
pub(crate) fn var_or_default_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.trim().to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read a value through `lookup` as string or return the default
pub(crate) fn var_or_default_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Process environment lookup used by the `from_env` constructors
pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
