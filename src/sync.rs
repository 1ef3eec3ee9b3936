use crate::download_plan::{DownloadPlan, Outcome};
use crate::http::ArchiveOps;
use crate::listing::{DateListing, RemoteLister};
use crate::local::LocalState;
use crate::planner::{self, RemoteEntry};
use crate::request::GranuleRequest;
use anyhow::{bail, Context, Result};
use futures_util::{pin_mut, StreamExt};
use std::fmt;
use std::fs;
use tracing::{debug, info, warn};

/// Tally of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub listed: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Transfers decided but left alone because of a dry run.
    pub not_fetched: usize,
    pub dates_skipped: usize,
    pub bytes: u64,
}

impl SyncReport {
    /// Every listed date was read and every decided transfer went through.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.dates_skipped == 0
    }

    fn from_plan(plan: &DownloadPlan, dates_skipped: usize) -> Self {
        Self {
            listed: plan.tasks().len(),
            fetched: plan.count(|o| matches!(o, Outcome::Downloaded { .. })),
            skipped: plan.count(|o| *o == Outcome::Skipped),
            failed: plan.count(|o| matches!(o, Outcome::Failed { .. })),
            not_fetched: plan.count(|o| *o == Outcome::NotFetched),
            dates_skipped,
            bytes: plan.bytes_downloaded(),
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} listed, {} fetched ({} bytes), {} skipped, {} failed",
            self.listed, self.fetched, self.bytes, self.skipped, self.failed
        )?;
        if self.not_fetched > 0 {
            write!(f, ", {} not fetched (dry run)", self.not_fetched)?;
        }
        if self.dates_skipped > 0 {
            write!(f, ", {} dates could not be listed", self.dates_skipped)?;
        }
        Ok(())
    }
}

/// Bring `request.output_dir` up to date with the archive.
///
/// Dates are listed one at a time and each date's transfers run before the next
/// listing is requested. Only a rejected login or an unreadable date index stop
/// the run; everything else is logged and passed over.
pub async fn run(ops: &impl ArchiveOps, request: &GranuleRequest) -> Result<SyncReport> {
    let output_dir = request.output_dir.as_path();
    if !output_dir.exists() && !request.dry_run {
        info!("Creating output directory {:?}", output_dir);
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Unable to create output directory {:?}", output_dir))?;
    }

    let local = LocalState::scan(output_dir, request)
        .with_context(|| format!("Unable to read output directory {:?}", output_dir))?;
    info!(
        "Syncing {} {} {} into {:?} ({} local files, {} policy)",
        request.platform,
        request.product,
        request.year,
        output_dir,
        local.len(),
        request.policy
    );

    let lister = RemoteLister::new(ops, request);
    let dates = lister
        .dates()
        .await
        .context("Unable to list date directories")?;
    info!(
        "{} date directories between day {} and {}",
        dates.len(),
        request.doys.begin,
        request.doys.end
    );

    let mut plan = DownloadPlan::new(&request.product.to_string(), request.policy);
    let mut dates_skipped = 0;

    let listings = lister.entries(dates);
    pin_mut!(listings);

    while let Some(DateListing { date, result }) = listings.next().await {
        let mut entries = match result {
            Ok(entries) => entries,
            Err(err) if err.is_fatal() => bail!(err),
            Err(err) => {
                warn!("Skipping {}: {}", date.label, err);
                dates_skipped += 1;
                continue;
            }
        };
        debug!("{}: {} granules listed", date.label, entries.len());

        if request.policy.needs_remote_size() {
            resolve_sizes(ops, &mut entries, &local).await;
        }

        for (entry, decision) in planner::plan(&entries, &local, request.policy) {
            plan.push(entry, decision);
        }
        plan.execute(ops, output_dir, request.dry_run).await;
    }

    if let Some(path) = &request.plan_path {
        plan.write(path)
            .with_context(|| format!("Unable to write plan to {:?}", path))?;
        info!("Plan written to {:?}", path);
    }

    let report = SyncReport::from_plan(&plan, dates_skipped);
    info!("Done: {}", report);
    Ok(report)
}

/// Ask the server for the sizes the listing left out, but only for files we
/// already have: a missing file is fetched whatever its size.
async fn resolve_sizes(ops: &impl ArchiveOps, entries: &mut [RemoteEntry], local: &LocalState) {
    for entry in entries
        .iter_mut()
        .filter(|e| e.size.is_none() && local.contains(&e.filename))
    {
        match ops.content_length(&entry.url).await {
            Ok(size) => entry.size = size,
            Err(err) => debug!("No size for {}: {}", entry.filename, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{SyncDecision, SyncPolicy};
    use url::Url;

    fn entry(name: &str) -> RemoteEntry {
        RemoteEntry {
            doy: 1,
            filename: name.to_string(),
            url: Url::parse(&format!("https://archive.test/{name}")).unwrap(),
            size: Some(5),
        }
    }

    #[test]
    fn test_report_counts_outcomes() {
        let mut plan = DownloadPlan::new("MOD09GA.005", SyncPolicy::Verified);
        plan.push(&entry("a.hdf"), SyncDecision::Skip);
        plan.push(&entry("b.hdf"), SyncDecision::Fetch);

        let report = SyncReport::from_plan(&plan, 2);
        assert_eq!(report.listed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.fetched, 0);
        assert_eq!(report.dates_skipped, 2);
        assert_eq!(
            report.to_string(),
            "2 listed, 0 fetched (0 bytes), 1 skipped, 0 failed, 2 dates could not be listed"
        );
        assert!(!report.is_complete());
        assert!(SyncReport::from_plan(&plan, 0).is_complete());
    }
}
