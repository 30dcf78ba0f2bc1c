// Test mocks for the pipeline's four trait seams:
// - MockSource (TenderSource) — canned SourceFetch, records queries
// - MockJudge (RelevanceJudge) — needle-matched canned verdicts
// - MockSender (DigestSender) — in-memory outbox
// - Translate fakes live with the translator tests
//
// Plus helpers for constructing TenderNotice fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tenderwatch_common::{DigestMessage, SourceKind, TenderNotice, TenderWatchError};

use crate::traits::{DigestSender, RelevanceJudge, SourceFetch, TenderAssessment, TenderSource};

// ---------------------------------------------------------------------------
// Notice fixtures
// ---------------------------------------------------------------------------

pub fn notice(id: &str, title: &str, source: SourceKind) -> TenderNotice {
    TenderNotice {
        external_id: id.to_string(),
        title: title.to_string(),
        description: None,
        publication_date: None,
        deadline: None,
        source_url: format!("https://example.org/tender/{id}"),
        source,
    }
}

pub fn notice_published(
    id: &str,
    title: &str,
    source: SourceKind,
    published: DateTime<Utc>,
) -> TenderNotice {
    TenderNotice {
        publication_date: Some(published),
        ..notice(id, title, source)
    }
}

pub fn notice_with_deadline(
    id: &str,
    title: &str,
    source: SourceKind,
    deadline: DateTime<Utc>,
) -> TenderNotice {
    TenderNotice {
        deadline: Some(deadline),
        ..notice(id, title, source)
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Canned source. Builder pattern: `.with_notices()`, `.degraded()`,
/// `.unavailable()`, `.with_delay()`. Records every query list it receives.
pub struct MockSource {
    kind: SourceKind,
    notices: Vec<TenderNotice>,
    degraded: bool,
    unavailable: bool,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            notices: Vec::new(),
            degraded: false,
            unavailable: false,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_notices(mut self, notices: Vec<TenderNotice>) -> Self {
        self.notices = notices;
        self
    }

    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self.degraded = true;
        self.notices.clear();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Handle for asserting call counts after the source moved into the
    /// pipeline.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Handle for asserting the query lists each fetch received.
    pub fn query_log(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.queries)
    }
}

#[async_trait]
impl TenderSource for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, queries: &[String], max_results: usize) -> SourceFetch {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(queries.to_vec());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut notices = self.notices.clone();
        notices.truncate(max_results);
        SourceFetch {
            notices,
            degraded: self.degraded,
            unavailable: self.unavailable,
        }
    }
}

// ---------------------------------------------------------------------------
// MockJudge
// ---------------------------------------------------------------------------

enum Rule {
    Relevant { strength: f32, rationale: String },
    Irrelevant,
    Failing,
}

/// Verdicts keyed by a substring of the tender text (titles work well).
/// Judging a tender with no matching rule is an error, so tests notice
/// unexpected submissions.
pub struct MockJudge {
    rules: Vec<(String, Rule)>,
}

impl MockJudge {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn relevant(mut self, needle: &str, strength: f32, rationale: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            Rule::Relevant {
                strength,
                rationale: rationale.to_string(),
            },
        ));
        self
    }

    pub fn irrelevant(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Rule::Irrelevant));
        self
    }

    pub fn failing(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Rule::Failing));
        self
    }
}

#[async_trait]
impl RelevanceJudge for MockJudge {
    async fn judge(
        &self,
        _profile_context: &str,
        tender_text: &str,
    ) -> anyhow::Result<TenderAssessment> {
        let (_, rule) = self
            .rules
            .iter()
            .find(|(needle, _)| tender_text.contains(needle))
            .ok_or_else(|| anyhow!("MockJudge: no rule matches tender text: {tender_text}"))?;

        match rule {
            Rule::Relevant {
                strength,
                rationale,
            } => Ok(TenderAssessment {
                relevant: true,
                strength: *strength,
                rationale: rationale.clone(),
            }),
            Rule::Irrelevant => Ok(TenderAssessment {
                relevant: false,
                strength: 0.0,
                rationale: "neodpovídá zaměření".to_string(),
            }),
            Rule::Failing => Err(anyhow!("MockJudge: simulated judgment failure")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSender
// ---------------------------------------------------------------------------

pub struct MockSender {
    outbox: Arc<Mutex<Vec<DigestMessage>>>,
    fail: bool,
}

impl MockSender {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            outbox: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            outbox: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub fn outbox(&self) -> Arc<Mutex<Vec<DigestMessage>>> {
        Arc::clone(&self.outbox)
    }
}

#[async_trait]
impl DigestSender for MockSender {
    async fn send(&self, message: &DigestMessage) -> Result<String, TenderWatchError> {
        if self.fail {
            return Err(TenderWatchError::Delivery(
                "MockSender: simulated transport failure".to_string(),
            ));
        }
        self.outbox.lock().unwrap().push(message.clone());
        Ok("mock-message-id".to_string())
    }
}
