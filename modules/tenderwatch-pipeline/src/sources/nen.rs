// NEN portal client (nen.nipez.cz).
//
// The portal has no public API; the search result page is server-rendered
// markup. Each result row parses independently: a malformed row is skipped
// and counted, it never fails the whole fetch.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};
use url::Url;

use tenderwatch_common::{SourceKind, TenderNotice};

use crate::retry;
use crate::traits::{SourceFetch, TenderSource};

/// The portal renders at most one page of interest per query.
const MAX_ROWS_PER_QUERY: usize = 25;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub struct NenClient {
    client: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    query_delay: Duration,
}

impl NenClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
        query_delay: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build NEN HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            max_attempts: max_attempts.max(1),
            query_delay,
        }
    }

    /// Search URL with the portal's matrix-style parameters: open procedures
    /// only, submission deadline from today on.
    fn search_url(&self, keyword: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
        let today = Utc::now().date_naive().format("%Y-%m-%d");
        format!(
            "{}/verejne-zakazky/p:vz:query={}&stavZP=planovana,neukoncena,zadana&podaniLhuta={},&page=1-50",
            self.base_url, encoded, today
        )
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        for attempt in 0..self.max_attempts {
            let last = attempt + 1 == self.max_attempts;
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.text().await {
                            Ok(html) => return Some(html),
                            Err(e) => {
                                warn!(url, error = %e, "NEN response body read failed");
                                return None;
                            }
                        }
                    }
                    if retry::is_transient_status(status) && !last {
                        warn!(url, %status, attempt = attempt + 1, "NEN transient status, retrying");
                        tokio::time::sleep(retry::backoff_delay(attempt)).await;
                        continue;
                    }
                    warn!(url, %status, "NEN request failed, giving up");
                    return None;
                }
                Err(e) if retry::is_transient_error(&e) && !last => {
                    warn!(url, error = %e, attempt = attempt + 1, "NEN request error, retrying");
                    tokio::time::sleep(retry::backoff_delay(attempt)).await;
                }
                Err(e) => {
                    warn!(url, error = %e, "NEN request error, giving up");
                    return None;
                }
            }
        }
        None
    }
}

#[async_trait]
impl TenderSource for NenClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Czech
    }

    async fn fetch(&self, queries: &[String], max_results: usize) -> SourceFetch {
        let mut notices: Vec<TenderNotice> = Vec::new();
        let mut seen = HashSet::new();
        let mut failed_queries = 0usize;

        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.query_delay).await;
            }

            let url = self.search_url(query);
            let Some(html) = self.fetch_page(&url).await else {
                failed_queries += 1;
                continue;
            };

            let (parsed, skipped) = parse_listing(&html, &self.base_url);
            if skipped > 0 {
                warn!(query, skipped, "NEN listing had unparseable rows");
            }

            let mut added = 0usize;
            for notice in parsed {
                if seen.insert(notice.external_id.clone()) {
                    notices.push(notice);
                    added += 1;
                }
            }
            info!(query, added, "NEN query complete");

            if notices.len() >= max_results {
                notices.truncate(max_results);
                break;
            }
        }

        if !queries.is_empty() && failed_queries == queries.len() && notices.is_empty() {
            warn!("NEN unreachable for all queries");
            return SourceFetch::unavailable();
        }
        if failed_queries > 0 {
            return SourceFetch::partial(notices);
        }
        SourceFetch::complete(notices)
    }
}

enum Row {
    Parsed(TenderNotice),
    Skipped(&'static str),
}

/// Parse a search result page. Returns the parsed notices plus the count of
/// rows that had to be skipped.
fn parse_listing(html: &str, base_url: &str) -> (Vec<TenderNotice>, usize) {
    let Ok(base) = Url::parse(base_url) else {
        return (Vec::new(), 0);
    };

    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr.gov-table__row").unwrap();
    let link_selector = Selector::parse("a.gov-link[href]").unwrap();
    let title_selector =
        Selector::parse(r#"td[data-title="Název zadávacího postupu"]"#).unwrap();

    let mut notices = Vec::new();
    let mut skipped = 0usize;

    for row in document.select(&row_selector).take(MAX_ROWS_PER_QUERY) {
        match parse_row(&row, &base, &link_selector, &title_selector) {
            Row::Parsed(notice) => notices.push(notice),
            Row::Skipped(reason) => {
                skipped += 1;
                tracing::debug!(reason, "NEN row skipped");
            }
        }
    }

    (notices, skipped)
}

fn parse_row(
    row: &ElementRef,
    base: &Url,
    link_selector: &Selector,
    title_selector: &Selector,
) -> Row {
    let Some(href) = row
        .select(link_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty())
    else {
        return Row::Skipped("missing detail link");
    };

    let Ok(detail_url) = base.join(href) else {
        return Row::Skipped("unresolvable detail link");
    };

    let title = row
        .select(title_selector)
        .next()
        .map(|td| td.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Bez názvu".to_string());

    Row::Parsed(TenderNotice {
        external_id: href.to_string(),
        title,
        description: None,
        publication_date: None,
        deadline: None,
        source_url: detail_url.to_string(),
        source: SourceKind::Czech,
    })
}
