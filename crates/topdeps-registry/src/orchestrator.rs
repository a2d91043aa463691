//! Download pipeline
//!
//! ```text
//! NameLister -> dedup & truncate -> UrlResolver (fan-out)
//!            -> ArchiveFetcher (fan-out) -> flatten scopes -> audit
//! ```
//!
//! Each stage consumes the complete output of the previous one. Failed items
//! are recorded and dropped at the stage that produced them; the run itself
//! always completes and hands back a [`DownloadReport`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use topdeps_core::{NormalizeReport, PackageName, flatten_scoped_packages, missing_packages};

use crate::clock::{Clock, TokioClock};
use crate::config::Settings;
use crate::dedup::dedup_and_truncate;
use crate::error::Result;
use crate::fetcher::{ArchiveFetcher, DownloadTask, TarballFetcher};
use crate::http::HttpClient;
use crate::listing::NameLister;
use crate::resolver::UrlResolver;
use crate::stagger::Stagger;

/// Pipeline stage an item failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Listing,
    Resolving,
    Fetching,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Listing => write!(f, "listing"),
            Stage::Resolving => write!(f, "resolving"),
            Stage::Fetching => write!(f, "fetching"),
        }
    }
}

/// An item dropped from the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub stage: Stage,
    pub message: String,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// Packages asked for
    pub requested: usize,
    /// Listing pages that produced names
    pub pages_fetched: usize,
    /// Pages kept although they stayed short after every retry
    pub short_pages: usize,
    /// Names across all pages before dedup
    pub names_listed: usize,
    /// Deduplicated names selected for download, at most `requested`
    pub selected: Vec<PackageName>,
    /// Selected names whose tarball URL was resolved
    pub resolved: usize,
    /// Directories packages were placed at before flattening
    pub placed: Vec<PathBuf>,
    /// Layout normalization outcome
    pub normalize: NormalizeReport,
    /// Selected names absent from the destination after flattening
    pub missing: Vec<PackageName>,
    /// Items dropped along the way
    pub failures: Vec<ItemFailure>,
}

impl DownloadReport {
    /// Number of archives placed
    pub fn downloaded(&self) -> usize {
        self.placed.len()
    }

    /// Whether every requested package arrived
    pub fn is_complete(&self) -> bool {
        self.selected.len() == self.requested && self.missing.is_empty()
    }

    fn record(&mut self, stage: Stage, message: impl Into<String>) {
        self.failures.push(ItemFailure {
            stage,
            message: message.into(),
        });
    }
}

/// Runs the full acquisition pipeline
pub struct Downloader {
    lister: NameLister,
    resolver: UrlResolver,
    fetcher: Arc<dyn ArchiveFetcher>,
    fetch_stagger: Stagger,
}

impl Downloader {
    /// Create a downloader that talks to real endpoints on the tokio clock
    pub fn new(settings: Settings) -> Result<Self> {
        let client = HttpClient::new(&settings.http)?;
        let fetcher = Arc::new(TarballFetcher::new(client.clone()));
        Self::with_parts(settings, client, Arc::new(TokioClock), fetcher)
    }

    /// Create a downloader from explicit collaborators
    pub fn with_parts(
        settings: Settings,
        client: HttpClient,
        clock: Arc<dyn Clock>,
        fetcher: Arc<dyn ArchiveFetcher>,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            lister: NameLister::new(client.clone(), settings.clone(), Arc::clone(&clock))?,
            resolver: UrlResolver::new(client, settings.clone(), Arc::clone(&clock)),
            fetch_stagger: Stagger::new(settings.download_stagger, clock),
            fetcher,
        })
    }

    /// Acquire the `count` most depended-upon packages into `dest`
    ///
    /// Resolves once every stage has settled. Per-item failures are reported,
    /// never returned as an error.
    pub async fn run(&self, count: usize, dest: &Path) -> DownloadReport {
        let mut report = DownloadReport {
            requested: count,
            ..DownloadReport::default()
        };

        // Listing
        let mut listed = Vec::new();
        for page in self.lister.list(count).await {
            match page {
                Ok(page) => {
                    report.pages_fetched += 1;
                    if !page.complete {
                        report.short_pages += 1;
                    }
                    listed.extend(page.names);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping listing page");
                    report.record(Stage::Listing, e.to_string());
                }
            }
        }
        report.names_listed = listed.len();

        // Dedup & truncate
        report.selected = dedup_and_truncate(listed, count);
        tracing::info!(
            listed = report.names_listed,
            selected = report.selected.len(),
            requested = count,
            "selected packages"
        );

        // Resolve
        let mut tasks = Vec::new();
        for resolved in self.resolver.resolve_all(&report.selected).await {
            match resolved {
                Ok(package) => tasks.push(DownloadTask::new(package.tarball_url, dest)),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping unresolved package");
                    report.record(Stage::Resolving, e.to_string());
                }
            }
        }
        report.resolved = tasks.len();

        // Fetch
        let total = tasks.len();
        tracing::info!(archives = total, dest = %dest.display(), "downloading archives");
        let fetched = self
            .fetch_stagger
            .run(tasks, |index, task| async move {
                tracing::debug!(index = index + 1, total, url = %task.url, "downloading");
                let outcome = self.fetcher.fetch(&task).await;
                (task, outcome)
            })
            .await;

        for (task, outcome) in fetched {
            match outcome {
                Ok(path) => report.placed.push(path),
                Err(e) => {
                    tracing::warn!(url = %task.url, error = %e, "dropping failed download");
                    report.record(Stage::Fetching, format!("{}: {}", task.url, e));
                }
            }
        }

        // Normalize, strictly after every download settled, then audit
        let root = dest.to_path_buf();
        let selected = report.selected.clone();
        let settled = tokio::task::spawn_blocking(move || {
            let normalize = flatten_scoped_packages(&root);
            let missing: Vec<PackageName> = missing_packages(&root, &selected)
                .into_iter()
                .cloned()
                .collect();
            (normalize, missing)
        })
        .await;

        match settled {
            Ok((normalize, missing)) => {
                report.normalize = normalize;
                report.missing = missing;
            }
            Err(e) => {
                tracing::warn!(error = %e, "layout normalization did not finish");
                report.normalize.anomalies += 1;
                report.missing = report.selected.clone();
            }
        }

        let missing: HashSet<&PackageName> = report.missing.iter().collect();
        for (index, name) in report.selected.iter().enumerate() {
            if missing.contains(name) {
                tracing::warn!(package = %name, flattened = %name.flattened(), "package missing from destination");
            } else {
                tracing::debug!(package = %name, position = index + 1, count, "package present");
            }
        }

        tracing::info!(
            requested = count,
            downloaded = report.downloaded(),
            missing = report.missing.len(),
            failures = report.failures.len(),
            "download run complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<PackageName> {
        raw.iter().map(|n| PackageName::parse(n).unwrap()).collect()
    }

    #[test]
    fn test_report_complete() {
        let report = DownloadReport {
            requested: 2,
            selected: names(&["lodash", "@types/node"]),
            placed: vec![PathBuf::from("lodash"), PathBuf::from("@types/node")],
            ..DownloadReport::default()
        };
        assert!(report.is_complete());
        assert_eq!(report.downloaded(), 2);
    }

    #[test]
    fn test_report_shortfall_is_incomplete() {
        let report = DownloadReport {
            requested: 3,
            selected: names(&["lodash", "chalk"]),
            ..DownloadReport::default()
        };
        assert!(!report.is_complete());

        let mut report = DownloadReport {
            requested: 1,
            selected: names(&["chalk"]),
            missing: names(&["chalk"]),
            ..DownloadReport::default()
        };
        report.record(Stage::Fetching, "https://r.example/chalk.tgz: boom");
        assert!(!report.is_complete());
        assert_eq!(report.failures[0].stage.to_string(), "fetching");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings {
            page_size: 0,
            ..Settings::default()
        };
        assert!(Downloader::new(settings).is_err());
    }
}
