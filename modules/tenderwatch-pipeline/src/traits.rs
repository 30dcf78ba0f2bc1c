// Trait seams for the pipeline's external capabilities.
//
// One narrow trait per capability (source search, translation, relevance
// judgment, email delivery) so every stage runs against injected fakes in
// tests: no network, no API keys, `cargo test` in seconds.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use tenderwatch_common::{DigestMessage, SourceKind, TenderNotice, TenderWatchError};

// ---------------------------------------------------------------------------
// Source search
// ---------------------------------------------------------------------------

/// What one source produced for one run. Failures never escape as errors;
/// they degrade into flags the orchestrator can reason about.
#[derive(Debug, Default)]
pub struct SourceFetch {
    pub notices: Vec<TenderNotice>,
    /// Some queries failed after retries; `notices` is a partial set.
    pub degraded: bool,
    /// The source produced nothing and every attempt failed.
    pub unavailable: bool,
}

impl SourceFetch {
    pub fn complete(notices: Vec<TenderNotice>) -> Self {
        Self {
            notices,
            degraded: false,
            unavailable: false,
        }
    }

    pub fn partial(notices: Vec<TenderNotice>) -> Self {
        Self {
            notices,
            degraded: true,
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            notices: Vec::new(),
            degraded: true,
            unavailable: true,
        }
    }
}

#[async_trait]
pub trait TenderSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Run the given queries and normalize results. `external_id` values in
    /// the returned set are unique; an empty query list is a no-op.
    async fn fetch(&self, queries: &[String], max_results: usize) -> SourceFetch;
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Translate: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> anyhow::Result<String>;
}

// ---------------------------------------------------------------------------
// Relevance judgment
// ---------------------------------------------------------------------------

/// Structured verdict for one tender against one subscriber profile.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TenderAssessment {
    /// Whether the tender matches the subscriber's line of business.
    pub relevant: bool,
    /// Confidence in the verdict, 0.0 to 1.0.
    pub strength: f32,
    /// One or two sentences, in Czech, on why.
    pub rationale: String,
}

#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn judge(
        &self,
        profile_context: &str,
        tender_text: &str,
    ) -> anyhow::Result<TenderAssessment>;
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DigestSender: Send + Sync {
    /// Deliver one digest. Returns the transport message id.
    async fn send(&self, message: &DigestMessage) -> Result<String, TenderWatchError>;
}
