use crate::local::LocalState;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// How local files are checked against the remote listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// A local file counts as complete when its name and byte size both match.
    #[default]
    Verified,
    /// A local file counts as complete when its name matches. Truncated leftovers
    /// of an interrupted transfer are skipped too, and stay that way until deleted.
    PresenceOnly,
}

impl SyncPolicy {
    pub fn needs_remote_size(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => f.write_str("verified"),
            Self::PresenceOnly => f.write_str("presence-only"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub doy: u32,
    pub filename: String,
    pub url: Url,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    Skip,
    Fetch,
}

pub fn decide(entry: &RemoteEntry, local: &LocalState, policy: SyncPolicy) -> SyncDecision {
    let complete = match policy {
        SyncPolicy::Verified => match (local.size_of(&entry.filename), entry.size) {
            (Some(local_size), Some(remote_size)) => local_size == remote_size,
            _ => false,
        },
        SyncPolicy::PresenceOnly => local.contains(&entry.filename),
    };

    if complete {
        SyncDecision::Skip
    } else {
        SyncDecision::Fetch
    }
}

pub fn plan<'a>(
    entries: &'a [RemoteEntry],
    local: &LocalState,
    policy: SyncPolicy,
) -> Vec<(&'a RemoteEntry, SyncDecision)> {
    entries
        .iter()
        .map(|entry| (entry, decide(entry, local, policy)))
        .collect()
}
