// Pipeline orchestration: one subscriber task, one sequential run.
//
// Stages advance Fetching → Scoring → Composing → Sending → Done. Per-item
// and per-source failures degrade and the run keeps going; only total source
// unavailability or delivery failure fails the task, and the failure is a
// reported state, never a crash. One task is one unit of isolation.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use tenderwatch_common::{Config, SourceKind, SubscriberTask, TenderWatchError};

use crate::digest;
use crate::scorer::{OpenAiJudge, RelevanceScorer};
use crate::sender::BrevoSender;
use crate::sources::{NenClient, TedClient};
use crate::traits::{DigestSender, RelevanceJudge, TenderSource};
use crate::translator::{DeeplTranslate, KeywordLocalizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Scoring,
    Composing,
    Sending,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetching => write!(f, "fetching"),
            Stage::Scoring => write!(f, "scoring"),
            Stage::Composing => write!(f, "composing"),
            Stage::Sending => write!(f, "sending"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Done,
    Failed(Stage),
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Done => write!(f, "Done"),
            TaskState::Failed(stage) => write!(f, "Failed({stage})"),
        }
    }
}

/// Stats from one task run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: TaskState,
    pub stage: Stage,
    pub fetched: usize,
    pub degraded_sources: Vec<SourceKind>,
    pub unavailable_sources: Vec<SourceKind>,
    pub judged: usize,
    pub relevant: usize,
    pub undetermined: usize,
    pub duplicates_skipped: usize,
    pub message_id: Option<String>,
    pub failure: Option<String>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: TaskState::Failed(Stage::Fetching),
            stage: Stage::Fetching,
            fetched: 0,
            degraded_sources: Vec::new(),
            unavailable_sources: Vec::new(),
            judged: 0,
            relevant: 0,
            undetermined: 0,
            duplicates_skipped: 0,
            message_id: None,
            failure: None,
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn kinds(list: &[SourceKind]) -> String {
            if list.is_empty() {
                "-".to_string()
            } else {
                list.iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        writeln!(f, "\n=== Task Run Complete ===")?;
        writeln!(f, "State:              {}", self.state)?;
        writeln!(f, "Notices fetched:    {}", self.fetched)?;
        writeln!(f, "Sources degraded:   {}", kinds(&self.degraded_sources))?;
        writeln!(f, "Sources down:       {}", kinds(&self.unavailable_sources))?;
        writeln!(f, "Notices judged:     {}", self.judged)?;
        writeln!(f, "Relevant:           {}", self.relevant)?;
        writeln!(f, "Undetermined:       {}", self.undetermined)?;
        writeln!(f, "Duplicates skipped: {}", self.duplicates_skipped)?;
        writeln!(
            f,
            "Message id:         {}",
            self.message_id.as_deref().unwrap_or("-")
        )?;
        if let Some(failure) = &self.failure {
            writeln!(f, "Failure:            {failure}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_queries_per_source: usize,
    pub judge_delay: Duration,
    pub max_judged: usize,
    pub task_deadline: Duration,
    pub unsubscribe_base_url: String,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_queries_per_source: config.max_queries_per_source,
            judge_delay: config.judge_delay,
            max_judged: config.max_judged,
            task_deadline: config.task_deadline,
            unsubscribe_base_url: config.unsubscribe_base_url.clone(),
        }
    }
}

pub struct Pipeline {
    sources: Vec<Box<dyn TenderSource>>,
    localizer: KeywordLocalizer,
    judge: Box<dyn RelevanceJudge>,
    sender: Box<dyn DigestSender>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Box<dyn TenderSource>>,
        localizer: KeywordLocalizer,
        judge: Box<dyn RelevanceJudge>,
        sender: Box<dyn DigestSender>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            sources,
            localizer,
            judge,
            sender,
            options,
        }
    }

    /// Production wiring: both source clients plus the configured
    /// translation, judgment and delivery capabilities.
    pub fn from_config(config: &Config) -> Self {
        let sources: Vec<Box<dyn TenderSource>> = vec![
            Box::new(NenClient::new(
                config.nen_base_url.as_str(),
                config.request_timeout,
                config.max_fetch_attempts,
                config.query_delay,
            )),
            Box::new(TedClient::new(
                config.ted_search_url.as_str(),
                config.request_timeout,
                config.max_fetch_attempts,
                config.query_delay,
            )),
        ];

        let localizer = match &config.deepl_api_key {
            Some(key) => KeywordLocalizer::new(Box::new(DeeplTranslate::new(key))),
            None => KeywordLocalizer::passthrough(),
        };

        Self::new(
            sources,
            localizer,
            Box::new(OpenAiJudge::new(&config.openai_api_key, &config.openai_model)),
            Box::new(BrevoSender::new(
                &config.brevo_api_key,
                &config.sender_name,
                &config.sender_email,
                config.max_fetch_attempts,
            )),
            PipelineOptions::from_config(config),
        )
    }

    /// Swap the delivery capability (used by `--dry-run`).
    pub fn with_sender(mut self, sender: Box<dyn DigestSender>) -> Self {
        self.sender = sender;
        self
    }

    /// Run one subscriber task to completion within the wall-clock budget.
    ///
    /// Errors only on invalid input; everything past validation resolves to
    /// a `RunReport` whose state is `Done` or `Failed(stage)`.
    pub async fn run(&self, task: &SubscriberTask) -> Result<RunReport, TenderWatchError> {
        task.validate()?;

        let mut report = RunReport::new();
        info!(
            run_id = %report.run_id,
            subscriber = task.subscriber_id.as_str(),
            "Task run starting"
        );

        match tokio::time::timeout(
            self.options.task_deadline,
            self.run_inner(task, &mut report),
        )
        .await
        {
            Ok(Ok(())) => {
                report.state = TaskState::Done;
            }
            Ok(Err(e)) => {
                error!(run_id = %report.run_id, stage = %report.stage, error = %e, "Task run failed");
                report.failure = Some(e.to_string());
                report.state = TaskState::Failed(report.stage);
            }
            Err(_) => {
                let budget =
                    TenderWatchError::DeadlineExceeded(self.options.task_deadline.as_secs());
                error!(run_id = %report.run_id, stage = %report.stage, "{budget}");
                report.failure = Some(budget.to_string());
                report.state = TaskState::Failed(report.stage);
            }
        }

        Ok(report)
    }

    async fn run_inner(
        &self,
        task: &SubscriberTask,
        report: &mut RunReport,
    ) -> Result<(), TenderWatchError> {
        // --- Fetching ---
        report.stage = Stage::Fetching;
        let keywords = task.normalized_keywords();

        let selected: Vec<&dyn TenderSource> = self
            .sources
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| task.source_selection.includes(s.kind()))
            .collect();
        if selected.is_empty() {
            return Err(TenderWatchError::AllSourcesUnavailable);
        }

        let mut notices = Vec::new();
        let mut any_available = false;
        for source in selected {
            let mut queries = self.localizer.localize(&keywords, source.kind()).await;
            queries.truncate(self.options.max_queries_per_source);

            let fetch = source.fetch(&queries, task.max_results).await;
            if fetch.unavailable {
                report.unavailable_sources.push(source.kind());
                continue;
            }
            any_available = true;
            if fetch.degraded {
                report.degraded_sources.push(source.kind());
            }
            notices.extend(fetch.notices);
        }
        if !any_available {
            return Err(TenderWatchError::AllSourcesUnavailable);
        }
        report.fetched = notices.len();
        info!(fetched = report.fetched, "Fetch stage complete");

        // --- Scoring ---
        report.stage = Stage::Scoring;
        let scorer = RelevanceScorer::new(
            self.judge.as_ref(),
            self.options.judge_delay,
            self.options.max_judged,
        );
        let outcome = scorer.score(task, &notices).await;
        report.judged = outcome.judged;
        report.relevant = outcome.relevant.len();
        report.undetermined = outcome.undetermined;
        report.duplicates_skipped = outcome.duplicates_skipped;

        // --- Composing ---
        // An empty relevant set still composes: subscribers get the
        // "no matches" confirmation that the cycle ran.
        report.stage = Stage::Composing;
        let message = digest::compose(
            task,
            outcome.relevant,
            Utc::now(),
            &self.options.unsubscribe_base_url,
        );

        // --- Sending ---
        report.stage = Stage::Sending;
        let message_id = self.sender.send(&message).await?;
        info!(message_id = message_id.as_str(), "Digest delivered");
        report.message_id = Some(message_id);

        Ok(())
    }
}
