//! Link resolution seam between the session and the playlist service

use anyhow::Result;
use std::future::Future;

/// Answer of the service to a playable-link request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    Ready(String),
    /// The service is still fetching links for this track
    Pending(String),
    NoAlternatives,
}

/// Source of playable links for tracks.
///
/// `failed_link` is the link that just failed, so the service can avoid
/// handing it out again.
pub trait LinkResolver: Clone + Send + Sync + 'static {
    fn resolve_link(
        &self,
        source_id: String,
        failed_link: Option<String>,
    ) -> impl Future<Output = Result<LinkOutcome>> + Send;
}
