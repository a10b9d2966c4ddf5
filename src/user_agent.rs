//! Shared User-Agent string for snapshot HTTP traffic.

/// Default User-Agent for snapshot requests (identifies the tool; RFC 9308).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("websnap/{version} (webpage-snapshot-tool)")
}
