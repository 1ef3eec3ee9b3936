use crate::error::FetchError;
use crate::http::ArchiveOps;
use crate::planner::{RemoteEntry, SyncDecision, SyncPolicy};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Outcome {
    Pending,
    Skipped,
    NotFetched,
    Downloaded { bytes: u64 },
    Failed { reason: String },
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DownloadTask {
    pub doy: u32,
    pub filename: String,
    pub url: Url,
    pub remote_size: Option<u64>,
    pub decision: SyncDecision,
    pub outcome: Outcome,
}

impl DownloadTask {
    pub fn new(entry: &RemoteEntry, decision: SyncDecision) -> Self {
        let outcome = match decision {
            SyncDecision::Skip => Outcome::Skipped,
            SyncDecision::Fetch => Outcome::Pending,
        };
        DownloadTask {
            doy: entry.doy,
            filename: entry.filename.clone(),
            url: entry.url.clone(),
            remote_size: entry.size,
            decision,
            outcome,
        }
    }
}

/// Every decision taken during a run, in listing order, with what became of it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    product: String,
    policy: SyncPolicy,
    tasks: Vec<DownloadTask>,
}

impl DownloadPlan {
    pub fn new(product: &str, policy: SyncPolicy) -> Self {
        Self {
            product: product.to_string(),
            policy,
            tasks: vec![],
        }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let plan: Self = serde_json::from_str(&content)?;
        Ok(plan)
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn push(self: &mut Self, entry: &RemoteEntry, decision: SyncDecision) {
        match decision {
            SyncDecision::Skip => debug!("File {} already present. Skipping", entry.filename),
            SyncDecision::Fetch => debug!("File {} needs fetching", entry.filename),
        }
        self.tasks.push(DownloadTask::new(entry, decision));
    }

    pub fn tasks(self: &Self) -> &[DownloadTask] {
        &self.tasks
    }

    pub fn count(self: &Self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(&t.outcome)).count()
    }

    pub fn bytes_downloaded(self: &Self) -> u64 {
        self.tasks
            .iter()
            .map(|t| match t.outcome {
                Outcome::Downloaded { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    /// Run every pending transfer in order. A failed transfer is recorded and the
    /// queue carries on; nothing is retried.
    pub async fn execute(
        self: &mut Self,
        provider: &impl ArchiveOps,
        output_dir: &Path,
        dry_run: bool,
    ) {
        for task in self
            .tasks
            .iter_mut()
            .filter(|t| t.outcome == Outcome::Pending)
        {
            if dry_run {
                info!("Would fetch {}", task.filename);
                task.outcome = Outcome::NotFetched;
                continue;
            }

            task.outcome = match try_download(provider, &task.url, output_dir, &task.filename).await {
                Ok(bytes) => Outcome::Downloaded { bytes },
                Err(err) => {
                    warn!("Could not fetch {}: {}", task.filename, err);
                    Outcome::Failed {
                        reason: err.to_string(),
                    }
                }
            };
        }
    }
}

pub async fn try_download(
    provider: &impl ArchiveOps,
    url: &Url,
    output_dir: &Path,
    filename: &str,
) -> Result<u64, FetchError> {
    let dst = output_dir.join(filename);

    info!("Getting {}...", filename);
    let bytes = provider.download(url, &dst).await?;
    info!("Saved {:?} ({} bytes)", dst, bytes);

    Ok(bytes)
}
