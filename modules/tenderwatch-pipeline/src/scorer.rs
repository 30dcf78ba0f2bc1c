// Relevance scoring: one structured verdict per tender.
//
// Judgment is delegated to the language model behind `RelevanceJudge`. The
// scorer owns everything around the calls: the within-run verdict cache (a
// tender is never submitted twice), the per-call pacing that keeps us under
// the provider quota, the undetermined-on-failure policy, and the ranking.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use ai_client::OpenAi;
use tenderwatch_common::{ScoredTender, SourceKind, SubscriberTask, TenderNotice};

use crate::traits::{RelevanceJudge, TenderAssessment};

/// System prompt for the judge. Czech in, Czech out: rationales land in the
/// subscriber's digest verbatim.
const JUDGE_PREAMBLE: &str = "Jste odborný asistent pro hodnocení relevance veřejných zakázek. \
Na základě popisu firmy a jejích klíčových slov posuďte, zda je zakázka pro firmu skutečně \
relevantní. Zaměřte se na předmět podnikání; jazyk nabídky není rozhodující faktor. \
Odpovídejte česky.";

pub struct OpenAiJudge {
    agent: OpenAi,
}

impl OpenAiJudge {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            agent: OpenAi::new(api_key, model),
        }
    }
}

#[async_trait]
impl RelevanceJudge for OpenAiJudge {
    async fn judge(
        &self,
        profile_context: &str,
        tender_text: &str,
    ) -> anyhow::Result<TenderAssessment> {
        let user = format!("{profile_context}\n\nZAKÁZKA:\n{tender_text}");
        self.agent.extract(JUDGE_PREAMBLE, user).await
    }
}

/// What scoring produced, with enough counters for the run report.
#[derive(Debug, Default)]
pub struct ScoringOutcome {
    pub relevant: Vec<ScoredTender>,
    pub judged: usize,
    pub undetermined: usize,
    pub duplicates_skipped: usize,
}

pub struct RelevanceScorer<'a> {
    judge: &'a dyn RelevanceJudge,
    call_delay: Duration,
    max_judged: usize,
}

impl<'a> RelevanceScorer<'a> {
    pub fn new(judge: &'a dyn RelevanceJudge, call_delay: Duration, max_judged: usize) -> Self {
        Self {
            judge,
            call_delay,
            max_judged,
        }
    }

    /// Judge each notice against the profile. A failed judgment marks the
    /// item undetermined and moves on; the returned relevant set is ranked.
    pub async fn score(
        &self,
        task: &SubscriberTask,
        notices: &[TenderNotice],
    ) -> ScoringOutcome {
        let profile = profile_context(task);
        let mut outcome = ScoringOutcome::default();
        let mut judged: HashSet<(SourceKind, String)> = HashSet::new();

        for notice in notices.iter().take(self.max_judged) {
            let key = (notice.source, notice.external_id.clone());
            if !judged.insert(key) {
                outcome.duplicates_skipped += 1;
                continue;
            }

            if outcome.judged > 0 {
                tokio::time::sleep(self.call_delay).await;
            }
            outcome.judged += 1;

            match self.judge.judge(&profile, &tender_text(notice)).await {
                Ok(assessment) if assessment.relevant => {
                    outcome.relevant.push(ScoredTender {
                        notice: notice.clone(),
                        strength: assessment.strength.clamp(0.0, 1.0),
                        rationale: assessment.rationale,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(external_id = notice.external_id.as_str(), error = %e,
                          "Judgment failed, dropping tender as undetermined");
                    outcome.undetermined += 1;
                }
            }
        }

        rank(&mut outcome.relevant);
        info!(
            judged = outcome.judged,
            relevant = outcome.relevant.len(),
            undetermined = outcome.undetermined,
            "Scoring complete"
        );
        outcome
    }
}

fn profile_context(task: &SubscriberTask) -> String {
    format!(
        "FIRMA:\nPopis: {}\nKlíčová slova: {}",
        task.company_description.trim(),
        task.normalized_keywords().join(", ")
    )
}

fn tender_text(notice: &TenderNotice) -> String {
    let mut text = format!(
        "Název: {}\nZdroj: {}\nOdkaz: {}",
        notice.title, notice.source, notice.source_url
    );
    if let Some(desc) = &notice.description {
        text.push_str("\nPopis: ");
        text.push_str(desc);
    }
    if let Some(deadline) = notice.deadline {
        text.push_str(&format!("\nLhůta: {}", deadline.format("%d.%m.%Y")));
    }
    text
}

/// Strength descending, ties by most recent publication date. Stable, so
/// re-ranking an already ranked slice is a no-op.
pub fn rank(items: &mut [ScoredTender]) {
    items.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then_with(|| b.notice.publication_date.cmp(&a.notice.publication_date))
    });
}
