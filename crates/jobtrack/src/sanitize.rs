//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Traces may be shared for debugging, so sender addresses and file
//! locations are reduced before they are recorded.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::extract::pattern::sender_address;

/// Keeps only the domain of a sender address.
///
/// - `Jane Doe <jane@acme.com>` → `*@acme.com`
/// - `no address` → `<unknown>`
pub fn redact_address(sender: &str) -> String {
    match sender_address(sender).rsplit_once('@') {
        Some((_, domain)) if !domain.is_empty() => format!("*@{}", domain.to_lowercase()),
        _ => "<unknown>".to_string(),
    }
}

/// Returns only the file name component of a path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Short deterministic hash for correlating a value across log lines
/// without recording it.
pub fn hash_value(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
