//! Listing page scrape
//!
//! The "most depended upon" browse page lists a fixed number of packages per
//! page, addressed by `?offset=`. A page that yields fewer names than that is
//! treated as a partial response and retried.

use scraper::{Html, Selector};
use std::sync::Arc;

use topdeps_core::PackageName;

use crate::clock::Clock;
use crate::config::Settings;
use crate::error::{RegistryError, Result};
use crate::http::HttpClient;
use crate::retry::Retrier;
use crate::stagger::Stagger;

/// Number of listing pages to request for `count` packages
///
/// One page per `page_size` names, plus one extra page per
/// `extra_page_divisor` packages to make up for names repeated across pages.
#[must_use]
pub fn page_count(count: usize, page_size: usize, extra_page_divisor: usize) -> usize {
    count.div_ceil(page_size) + count.div_ceil(extra_page_divisor)
}

/// Offsets of the listing pages to request for `count` packages
#[must_use]
pub fn page_offsets(count: usize, page_size: usize, extra_page_divisor: usize) -> Vec<usize> {
    (0..page_count(count, page_size, extra_page_divisor))
        .map(|index| index * page_size)
        .collect()
}

/// Text content of every element matching `selector`
pub fn extract_package_names(html: &str, selector: &Selector) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect()
}

/// One fetched listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedPage {
    pub offset: usize,
    pub names: Vec<PackageName>,
    /// False when retries ran out and a short page was kept
    pub complete: bool,
}

/// Fetches listing pages through the retry and stagger layers
pub struct NameLister {
    client: HttpClient,
    settings: Settings,
    selector: Selector,
    retrier: Retrier,
    stagger: Stagger,
}

impl NameLister {
    pub fn new(client: HttpClient, settings: Settings, clock: Arc<dyn Clock>) -> Result<Self> {
        let selector =
            Selector::parse(&settings.name_selector).map_err(|e| RegistryError::InvalidConfig {
                message: format!("invalid name selector '{}': {}", settings.name_selector, e),
            })?;

        Ok(Self {
            client,
            retrier: Retrier::new(settings.listing_retry, Arc::clone(&clock)),
            stagger: Stagger::new(settings.listing_stagger, clock),
            settings,
            selector,
        })
    }

    /// Offsets this lister would request for `count` packages
    pub fn offsets(&self, count: usize) -> Vec<usize> {
        page_offsets(count, self.settings.page_size, self.settings.extra_page_divisor)
    }

    /// Fetch every page needed for `count` packages, staggered by page index
    ///
    /// Results are in offset order; a failed page does not affect the others.
    pub async fn list(&self, count: usize) -> Vec<Result<ListedPage>> {
        let offsets = self.offsets(count);
        tracing::info!(count, pages = offsets.len(), "fetching listing pages");

        self.stagger
            .run(offsets, |_, offset| self.fetch_page(offset))
            .await
    }

    /// Fetch one page, retrying until it holds a full page of names
    ///
    /// If retries run out on a page that kept coming back short but not
    /// empty, the last short page is kept: the listing may simply end there.
    pub async fn fetch_page(&self, offset: usize) -> Result<ListedPage> {
        let url = self.settings.page_url(offset);
        let page_size = self.settings.page_size;
        let key = format!("listing offset {}", offset);

        let outcome = self
            .retrier
            .run(&key, |_| self.fetch_names(&url), |names| names.len() == page_size)
            .await;

        let (found, complete) = match outcome {
            Ok(names) => (names, true),
            Err(mut exhausted) => match exhausted.last_rejected.take() {
                Some(names) if !names.is_empty() => {
                    tracing::warn!(
                        offset,
                        found = names.len(),
                        expected = page_size,
                        "keeping short listing page after retries"
                    );
                    (names, false)
                }
                rejected => {
                    exhausted.last_rejected = rejected;
                    return Err(exhausted.into_error());
                }
            },
        };

        let names = found
            .iter()
            .filter_map(|raw| match PackageName::parse(raw) {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::warn!(offset, name = %raw, error = %e, "skipping unparseable name");
                    None
                }
            })
            .collect();

        tracing::debug!(offset, complete, "fetched listing page");

        Ok(ListedPage {
            offset,
            names,
            complete,
        })
    }

    async fn fetch_names(&self, url: &str) -> Result<Vec<String>> {
        let html = self.client.get_text(url).await?;
        Ok(extract_package_names(&html, &self.selector))
    }
}
