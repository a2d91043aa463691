//! Topdeps registry pipeline
//!
//! Everything that talks to the network lives here:
//!
//! - **Listing**: scrape the "most depended upon" browse pages ([`NameLister`])
//! - **Resolution**: look up the `latest` tarball of each package ([`UrlResolver`])
//! - **Download**: fetch and place tarballs ([`ArchiveFetcher`], [`TarballFetcher`])
//! - **Orchestration**: run the stages in order and report ([`Downloader`])
//!
//! Request pacing is shared by every stage: a [`Retrier`] bounds attempts with
//! linear backoff, and a [`Stagger`] spreads a batch of requests over time.
//! Both sleep through a [`Clock`] so tests can run without real delays.
//!
//! ## Example
//!
//! ```rust,no_run
//! use topdeps_registry::{Downloader, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(Settings::load()?)?;
//! let report = downloader.run(100, "packages".as_ref()).await;
//! println!("{} of {} packages placed", report.downloaded(), report.requested);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod listing;
pub mod orchestrator;
pub mod resolver;
pub mod retry;
pub mod stagger;

// Re-exports for convenience
pub use clock::{Clock, RecordingClock, TokioClock};
pub use config::{HttpSettings, Settings};
pub use dedup::dedup_and_truncate;
pub use error::{RegistryError, Result};
pub use fetcher::{ArchiveFetcher, DownloadTask, STAGING_PREFIX, TarballFetcher, unpack_into};
pub use http::HttpClient;
pub use listing::{ListedPage, NameLister, extract_package_names, page_count, page_offsets};
pub use orchestrator::{DownloadReport, Downloader, ItemFailure, Stage};
pub use resolver::{LATEST_TAG, RegistryEntry, ResolvedPackage, UrlResolver};
pub use retry::{AttemptState, Exhausted, RetryPolicy, Retrier};
pub use stagger::Stagger;
