// End-to-end pipeline scenarios over the trait mocks: no network, no keys.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;

use tenderwatch_common::{SourceKind, SourceSelection, SubscriberTask, TenderWatchError};
use tenderwatch_pipeline::run::{Pipeline, PipelineOptions, Stage, TaskState};
use tenderwatch_pipeline::testing::{notice, MockJudge, MockSender, MockSource};
use tenderwatch_pipeline::traits::{DigestSender, RelevanceJudge, TenderSource, Translate};
use tenderwatch_pipeline::translator::KeywordLocalizer;

fn options() -> PipelineOptions {
    PipelineOptions {
        max_queries_per_source: 5,
        judge_delay: Duration::ZERO,
        max_judged: 50,
        task_deadline: Duration::from_secs(5),
        unsubscribe_base_url: "https://vyhledej-zakazky.cz/odhlasit/".to_string(),
    }
}

fn task(selection: SourceSelection) -> SubscriberTask {
    SubscriberTask {
        subscriber_id: "42".into(),
        email: "firma@example.cz".into(),
        source_selection: selection,
        keywords: vec!["IT services".into()],
        company_description: "Poskytujeme IT služby a vývoj software".into(),
        max_results: 25,
        notification_frequency: None,
    }
}

fn pipeline(
    sources: Vec<Box<dyn TenderSource>>,
    judge: Box<dyn RelevanceJudge>,
    sender: Box<dyn DigestSender>,
) -> Pipeline {
    Pipeline::new(
        sources,
        KeywordLocalizer::passthrough(),
        judge,
        sender,
        options(),
    )
}

#[tokio::test]
async fn invalid_task_fails_before_any_network_call() {
    let source = MockSource::new(SourceKind::Eu);
    let calls = source.call_counter();
    let sender = MockSender::new();
    let outbox = sender.outbox();

    let pipeline = pipeline(
        vec![Box::new(source)],
        Box::new(MockJudge::new()),
        Box::new(sender),
    );

    let mut invalid = task(SourceSelection::Eu);
    invalid.keywords.clear();
    invalid.company_description = String::new();

    let err = pipeline.run(&invalid).await.unwrap_err();
    assert!(matches!(err, TenderWatchError::InvalidTask(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(outbox.lock().unwrap().is_empty());
}

#[tokio::test]
async fn eu_digest_contains_exactly_the_relevant_items_in_score_order() {
    let source = MockSource::new(SourceKind::Eu).with_notices(vec![
        notice("n1", "Cloud migration services", SourceKind::Eu),
        notice("n2", "Road maintenance", SourceKind::Eu),
        notice("n3", "Software development framework", SourceKind::Eu),
    ]);
    let judge = MockJudge::new()
        .relevant("Cloud migration services", 0.6, "odpovídá IT zaměření")
        .failing("Road maintenance")
        .relevant("Software development framework", 0.9, "přímá shoda s vývojem software");
    let sender = MockSender::new();
    let outbox = sender.outbox();

    let pipeline = pipeline(vec![Box::new(source)], Box::new(judge), Box::new(sender));
    let report = pipeline.run(&task(SourceSelection::Eu)).await.unwrap();

    assert_eq!(report.state, TaskState::Done);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.judged, 3);
    assert_eq!(report.relevant, 2);
    assert_eq!(report.undetermined, 1);
    assert_eq!(report.message_id.as_deref(), Some("mock-message-id"));

    let sent = outbox.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let digest = &sent[0];
    assert_eq!(digest.items.len(), 2);
    // ranked by strength: n3 (0.9) before n1 (0.6)
    assert_eq!(digest.items[0].notice.external_id, "n3");
    assert_eq!(digest.items[1].notice.external_id, "n1");
    // the undetermined tender never shows up
    assert!(!digest.html_body.contains("Road maintenance"));
}

#[tokio::test]
async fn one_source_down_still_reaches_done_with_the_other() {
    let czech = MockSource::new(SourceKind::Czech).unavailable();
    let eu = MockSource::new(SourceKind::Eu)
        .with_notices(vec![notice("n1", "Cloud migration services", SourceKind::Eu)]);
    let judge = MockJudge::new().relevant("Cloud migration services", 0.8, "IT");
    let sender = MockSender::new();
    let outbox = sender.outbox();

    let pipeline = pipeline(
        vec![Box::new(czech), Box::new(eu)],
        Box::new(judge),
        Box::new(sender),
    );
    let report = pipeline.run(&task(SourceSelection::Both)).await.unwrap();

    assert_eq!(report.state, TaskState::Done);
    assert_eq!(report.unavailable_sources, vec![SourceKind::Czech]);
    assert_eq!(report.relevant, 1);
    assert_eq!(outbox.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn both_sources_down_fails_fetching_and_sends_nothing() {
    let czech = MockSource::new(SourceKind::Czech).unavailable();
    let eu = MockSource::new(SourceKind::Eu).unavailable();
    let sender = MockSender::new();
    let outbox = sender.outbox();

    let pipeline = pipeline(
        vec![Box::new(czech), Box::new(eu)],
        Box::new(MockJudge::new()),
        Box::new(sender),
    );
    let report = pipeline.run(&task(SourceSelection::Both)).await.unwrap();

    assert_eq!(report.state, TaskState::Failed(Stage::Fetching));
    assert!(report.failure.is_some());
    assert!(outbox.lock().unwrap().is_empty());
}

#[tokio::test]
async fn zero_matches_still_delivers_a_no_matches_digest() {
    let eu = MockSource::new(SourceKind::Eu)
        .with_notices(vec![notice("n1", "Road maintenance", SourceKind::Eu)]);
    let judge = MockJudge::new().irrelevant("Road maintenance");
    let sender = MockSender::new();
    let outbox = sender.outbox();

    let pipeline = pipeline(vec![Box::new(eu)], Box::new(judge), Box::new(sender));
    let report = pipeline.run(&task(SourceSelection::Eu)).await.unwrap();

    assert_eq!(report.state, TaskState::Done);
    assert_eq!(report.relevant, 0);

    let sent = outbox.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].items.is_empty());
    assert!(sent[0].text_body.contains("nenašli žádné nové zakázky"));
}

#[tokio::test]
async fn degraded_fetch_advances_and_is_reported() {
    let eu = MockSource::new(SourceKind::Eu)
        .with_notices(vec![notice("n1", "Cloud migration services", SourceKind::Eu)])
        .degraded();
    let judge = MockJudge::new().relevant("Cloud migration services", 0.8, "IT");
    let sender = MockSender::new();

    let pipeline = pipeline(vec![Box::new(eu)], Box::new(judge), Box::new(sender));
    let report = pipeline.run(&task(SourceSelection::Eu)).await.unwrap();

    assert_eq!(report.state, TaskState::Done);
    assert_eq!(report.degraded_sources, vec![SourceKind::Eu]);
}

#[tokio::test]
async fn delivery_failure_ends_in_failed_sending() {
    let eu = MockSource::new(SourceKind::Eu)
        .with_notices(vec![notice("n1", "Cloud migration services", SourceKind::Eu)]);
    let judge = MockJudge::new().relevant("Cloud migration services", 0.8, "IT");

    let pipeline = pipeline(
        vec![Box::new(eu)],
        Box::new(judge),
        Box::new(MockSender::failing()),
    );
    let report = pipeline.run(&task(SourceSelection::Eu)).await.unwrap();

    assert_eq!(report.state, TaskState::Failed(Stage::Sending));
    assert!(report.failure.unwrap().contains("transport failure"));
    assert!(report.message_id.is_none());
}

#[tokio::test]
async fn deadline_overrun_aborts_without_sending() {
    let eu = MockSource::new(SourceKind::Eu)
        .with_notices(vec![notice("n1", "Cloud migration services", SourceKind::Eu)])
        .with_delay(Duration::from_millis(300));
    let sender = MockSender::new();
    let outbox = sender.outbox();

    let mut opts = options();
    opts.task_deadline = Duration::from_millis(50);
    let pipeline = Pipeline::new(
        vec![Box::new(eu)],
        KeywordLocalizer::passthrough(),
        Box::new(MockJudge::new()),
        Box::new(sender),
        opts,
    );
    let report = pipeline.run(&task(SourceSelection::Eu)).await.unwrap();

    assert_eq!(report.state, TaskState::Failed(Stage::Fetching));
    assert!(report.failure.unwrap().contains("wall-clock"));
    assert!(outbox.lock().unwrap().is_empty());
}

#[tokio::test]
async fn source_selection_filters_which_clients_run() {
    let czech = MockSource::new(SourceKind::Czech)
        .with_notices(vec![notice("c1", "Rekonstrukce serverovny", SourceKind::Czech)]);
    let eu = MockSource::new(SourceKind::Eu);
    let eu_calls = eu.call_counter();
    let judge = MockJudge::new().relevant("Rekonstrukce serverovny", 0.7, "IT infrastruktura");
    let sender = MockSender::new();

    let pipeline = pipeline(
        vec![Box::new(czech), Box::new(eu)],
        Box::new(judge),
        Box::new(sender),
    );
    let report = pipeline.run(&task(SourceSelection::Czech)).await.unwrap();

    assert_eq!(report.state, TaskState::Done);
    assert_eq!(eu_calls.load(Ordering::SeqCst), 0);
}

struct TableTranslator {
    table: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl Translate for TableTranslator {
    async fn translate(&self, text: &str, _: &str, _: &str) -> anyhow::Result<String> {
        Ok(self
            .table
            .get(text)
            .map(|t| t.to_string())
            .unwrap_or_else(|| text.to_string()))
    }
}

#[tokio::test]
async fn eu_queries_are_localized_and_czech_stay_native() {
    let czech = MockSource::new(SourceKind::Czech);
    let czech_queries = czech.query_log();
    let eu = MockSource::new(SourceKind::Eu);
    let eu_queries = eu.query_log();
    let sender = MockSender::new();

    let localizer = KeywordLocalizer::new(Box::new(TableTranslator {
        table: HashMap::from([("úklidové služby", "cleaning services")]),
    }));
    let pipeline = Pipeline::new(
        vec![Box::new(czech), Box::new(eu)],
        localizer,
        Box::new(MockJudge::new()),
        Box::new(sender),
        options(),
    );

    let mut t = task(SourceSelection::Both);
    t.keywords = vec!["úklidové služby".into()];
    let report = pipeline.run(&t).await.unwrap();

    assert_eq!(report.state, TaskState::Done);
    assert_eq!(
        czech_queries.lock().unwrap()[0],
        vec!["úklidové služby".to_string()]
    );
    assert_eq!(
        eu_queries.lock().unwrap()[0],
        vec!["cleaning services".to_string()]
    );
}

#[tokio::test]
async fn keyword_cap_limits_queries_per_source() {
    let eu = MockSource::new(SourceKind::Eu);
    let eu_queries = eu.query_log();
    let sender = MockSender::new();

    let pipeline = pipeline(
        vec![Box::new(eu)],
        Box::new(MockJudge::new()),
        Box::new(sender),
    );

    let mut t = task(SourceSelection::Eu);
    t.keywords = (0..12).map(|i| format!("klíčové slovo {i}")).collect();
    let report = pipeline.run(&t).await.unwrap();

    assert_eq!(report.state, TaskState::Done);
    assert_eq!(eu_queries.lock().unwrap()[0].len(), 5);
}
