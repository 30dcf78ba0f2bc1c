// TED search API client (api.ted.europa.eu, expert-query v3).
//
// Unlike the Czech portal this is a real JSON API; the quirks are all in the
// response shape: multilingual title maps, XML links that need rewriting
// into human-readable detail pages, and lot deadlines that arrive as either
// a list or a whitespace-joined string.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tenderwatch_common::{SourceKind, TenderNotice};

use crate::retry;
use crate::traits::{SourceFetch, TenderSource};

const DEFAULT_PAGE_SIZE: usize = 100;

pub struct TedClient {
    client: reqwest::Client,
    search_url: String,
    max_attempts: u32,
    query_delay: Duration,
    page_size: usize,
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    query: String,
    fields: Vec<&'static str>,
    page: usize,
    limit: usize,
    scope: &'static str,
    #[serde(rename = "checkQuerySyntax")]
    check_query_syntax: bool,
    #[serde(rename = "paginationMode")]
    pagination_mode: &'static str,
}

impl SearchRequest {
    fn for_keyword(keyword: &str, page: usize, limit: usize) -> Self {
        Self {
            query: format!("(notice-title={keyword})"),
            fields: vec![
                "publication-number",
                "notice-title",
                "links",
                "deadline-date-lot",
            ],
            page,
            limit,
            scope: "ACTIVE",
            check_query_syntax: false,
            pagination_mode: "PAGE_NUMBER",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    notices: Vec<RawNotice>,
}

#[derive(Debug, Deserialize)]
struct RawNotice {
    #[serde(rename = "publication-number", default)]
    publication_number: Option<String>,
    #[serde(rename = "notice-title", default)]
    notice_title: BTreeMap<String, String>,
    #[serde(default)]
    links: Links,
    #[serde(rename = "deadline-date-lot", default)]
    deadline: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    xml: BTreeMap<String, String>,
}

impl TedClient {
    pub fn new(
        search_url: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
        query_delay: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build TED HTTP client");
        Self {
            client,
            search_url: search_url.into(),
            max_attempts: max_attempts.max(1),
            query_delay,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    async fn search_page(&self, keyword: &str, page: usize) -> Option<SearchResponse> {
        let request = SearchRequest::for_keyword(keyword, page, self.page_size);

        for attempt in 0..self.max_attempts {
            let last = attempt + 1 == self.max_attempts;
            match self
                .client
                .post(&self.search_url)
                .header("accept", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.json::<SearchResponse>().await {
                            Ok(body) => return Some(body),
                            Err(e) => {
                                warn!(keyword, page, error = %e, "TED response parse failed");
                                return None;
                            }
                        }
                    }
                    if retry::is_transient_status(status) && !last {
                        warn!(keyword, page, %status, attempt = attempt + 1, "TED transient status, retrying");
                        tokio::time::sleep(retry::backoff_delay(attempt)).await;
                        continue;
                    }
                    warn!(keyword, page, %status, "TED request failed, giving up");
                    return None;
                }
                Err(e) if retry::is_transient_error(&e) && !last => {
                    warn!(keyword, page, error = %e, attempt = attempt + 1, "TED request error, retrying");
                    tokio::time::sleep(retry::backoff_delay(attempt)).await;
                }
                Err(e) => {
                    warn!(keyword, page, error = %e, "TED request error, giving up");
                    return None;
                }
            }
        }
        None
    }
}

#[async_trait]
impl TenderSource for TedClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Eu
    }

    async fn fetch(&self, queries: &[String], max_results: usize) -> SourceFetch {
        let now = Utc::now();
        let mut notices: Vec<TenderNotice> = Vec::new();
        let mut seen = HashSet::new();
        let mut failed_queries = 0usize;

        'queries: for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.query_delay).await;
            }

            let mut page = 1usize;
            loop {
                let Some(body) = self.search_page(query, page).await else {
                    // a failure mid-pagination still leaves this query partial
                    failed_queries += 1;
                    break;
                };

                let raw_count = body.notices.len();
                let mut accepted = 0usize;
                for raw in body.notices {
                    if let Some(notice) = normalize(raw, now) {
                        if seen.insert(notice.external_id.clone()) {
                            notices.push(notice);
                            accepted += 1;
                        }
                    }
                }
                info!(query, page, raw = raw_count, accepted, "TED page complete");

                if notices.len() >= max_results {
                    notices.truncate(max_results);
                    break 'queries;
                }
                if raw_count < self.page_size {
                    break; // source exhausted for this query
                }
                page += 1;
            }
        }

        if !queries.is_empty() && failed_queries == queries.len() && notices.is_empty() {
            warn!("TED unreachable for all queries");
            return SourceFetch::unavailable();
        }
        if failed_queries > 0 {
            return SourceFetch::partial(notices);
        }
        SourceFetch::complete(notices)
    }
}

/// Normalize one raw notice. Notices without a publication number, without a
/// usable link, or without a future deadline are dropped.
fn normalize(raw: RawNotice, now: DateTime<Utc>) -> Option<TenderNotice> {
    let publication_number = raw.publication_number?;

    let xml_link = raw.links.xml.get("MUL").or_else(|| {
        raw.links.xml.values().next()
    })?;
    let source_url = fix_detail_link(xml_link);

    let deadline = parse_deadline(&first_deadline(&raw.deadline)?)?;
    if deadline <= now {
        return None;
    }

    let title = raw
        .notice_title
        .get("eng")
        .or_else(|| raw.notice_title.values().next())
        .cloned()
        .unwrap_or_else(|| "Bez názvu".to_string());

    Some(TenderNotice {
        external_id: publication_number,
        title,
        description: None,
        publication_date: None,
        deadline: Some(deadline),
        source_url,
        source: SourceKind::Eu,
    })
}

/// The API hands out machine XML links; rewrite them to the human detail
/// page (`…/notice/-/detail/<id>`).
fn fix_detail_link(xml_link: &str) -> String {
    let trimmed = xml_link.strip_suffix("/xml").unwrap_or(xml_link);
    trimmed.replacen("/notice/", "/notice/-/detail/", 1)
}

/// `deadline-date-lot` is a list of per-lot deadlines, or sometimes one
/// whitespace-joined string. The first entry is the one that matters.
fn first_deadline(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Array(items) => items.first()?.as_str().map(str::to_string),
        serde_json::Value::String(s) => s.split_whitespace().next().map(str::to_string),
        _ => None,
    }
}

fn parse_deadline(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Dates arrive as "2026-09-15+02:00" for some notices; the day is enough.
    let date = NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(23, 59, 59)?.and_utc())
}
