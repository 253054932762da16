//! Integration tests for the code writer

use async_trait::async_trait;
use paperclip_editor::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

const COOLDOWN: Duration = Duration::from_millis(1000);

#[derive(Default)]
struct FakeDiffer {
    calls: Mutex<Vec<(Instant, Vec<CodeDiffRequest>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
    return_empty: bool,
    fail_first: bool,
    panic_first: bool,
}

impl FakeDiffer {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    fn empty() -> Self {
        Self {
            return_empty: true,
            ..Default::default()
        }
    }

    fn failing_first() -> Self {
        Self {
            fail_first: true,
            ..Default::default()
        }
    }

    fn panicking_first() -> Self {
        Self {
            panic_first: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(Instant, Vec<CodeDiffRequest>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiffRequester for FakeDiffer {
    async fn request_diffs(&self, requests: &[CodeDiffRequest]) -> CodeWriteResult<Vec<CodeDiff>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let first = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((Instant::now(), requests.to_vec()));
            calls.len() == 1
        };

        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if first && self.panic_first {
            panic!("diff service crashed");
        }
        if first && self.fail_first {
            return Err(CodeWriteError::DiffService("service unavailable".to_string()));
        }

        if self.return_empty {
            return Ok(vec![]);
        }
        Ok(requests
            .iter()
            .map(|request| CodeDiff {
                path: request.anchor.path.clone(),
                original: String::new(),
                generated: serde_json::to_string(request).unwrap(),
            })
            .collect())
    }
}

struct FakeWriter {
    batches: Mutex<Vec<Vec<CodeDiff>>>,
    succeed: bool,
    error_first: bool,
}

impl FakeWriter {
    fn new(succeed: bool) -> Self {
        Self {
            batches: Mutex::new(vec![]),
            succeed,
            error_first: false,
        }
    }

    fn erroring_first() -> Self {
        Self {
            error_first: true,
            ..Self::new(true)
        }
    }

    fn batches(&self) -> Vec<Vec<CodeDiff>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl WriteApplier for FakeWriter {
    async fn apply_diffs(&self, diffs: &[CodeDiff]) -> CodeWriteResult<bool> {
        let first = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(diffs.to_vec());
            batches.len() == 1
        };
        if first && self.error_first {
            return Err(CodeWriteError::Write("disk full".to_string()));
        }
        Ok(self.succeed)
    }
}

#[derive(Default)]
struct FakeCleaner {
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeCleaner {
    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyCleaner for FakeCleaner {
    async fn clean_keys(&self, files: &[String]) -> CodeWriteResult<()> {
        self.calls.lock().unwrap().push(files.to_vec());
        Ok(())
    }
}

#[derive(Default)]
struct FakeNavigator {
    opened: Mutex<Vec<AnchorId>>,
}

#[async_trait]
impl SourceNavigator for FakeNavigator {
    async fn open_source(&self, anchor: &Anchor) -> CodeWriteResult<()> {
        self.opened.lock().unwrap().push(anchor.id);
        Ok(())
    }

    async fn code_block(&self, anchor: &Anchor) -> CodeWriteResult<Option<String>> {
        Ok(Some(format!("<div /> // {}", anchor.path)))
    }
}

struct Harness {
    writer: CodeWriter,
    events: broadcast::Receiver<WriteEvent>,
    differ: Arc<FakeDiffer>,
    applier: Arc<FakeWriter>,
    cleaner: Arc<FakeCleaner>,
    navigator: Arc<FakeNavigator>,
}

impl Harness {
    fn new(arena: AnchorArena, differ: FakeDiffer, applier: FakeWriter) -> Self {
        let differ = Arc::new(differ);
        let applier = Arc::new(applier);
        let cleaner = Arc::new(FakeCleaner::default());
        let navigator = Arc::new(FakeNavigator::default());

        let services = CodeWriterServices {
            anchors: Arc::new(arena),
            differ: differ.clone(),
            writer: applier.clone(),
            cleaner: cleaner.clone(),
            navigator: Some(navigator.clone()),
        };
        let writer = CodeWriter::spawn(&CodeWriterConfig::default(), services);
        let events = writer.subscribe();

        Self {
            writer,
            events,
            differ,
            applier,
            cleaner,
            navigator,
        }
    }

    fn drain_events(&mut self) -> Vec<WriteEvent> {
        let mut events = vec![];
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    fn reports(&mut self) -> Vec<CycleReport> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                WriteEvent::CycleFinished(report) => Some(report),
                _ => None,
            })
            .collect()
    }
}

fn arena(selectors: &[(&str, &str)]) -> AnchorArena {
    let mut arena = AnchorArena::new();
    for (selector, path) in selectors {
        arena.insert(*selector, *path);
    }
    arena
}

fn target(selector: &str) -> ActionTarget {
    ActionTarget {
        surface_id: "main".to_string(),
        selector: selector.to_string(),
        uuid: selector.trim_start_matches('#').to_string(),
    }
}

fn location(selector: &str, index: usize) -> ActionElementLocation {
    ActionElementLocation {
        position: InsertPos::Index,
        target_selector: selector.to_string(),
        index,
    }
}

fn edit_text(selector: &str, content: &str) -> Action {
    Action::EditText(EditTextAction {
        targets: vec![target(selector)],
        original_content: String::new(),
        new_content: content.to_string(),
    })
}

fn update_style(selectors: &[&str], value: &str) -> Action {
    Action::UpdateStyle(UpdateStyleAction {
        targets: selectors
            .iter()
            .map(|selector| StyleActionTarget {
                target: target(selector),
                change: Change {
                    updated: value.to_string(),
                    original: String::new(),
                },
            })
            .collect(),
        style: "color".to_string(),
    })
}

fn insert_into(parent: &str) -> Action {
    Action::InsertElement(InsertElementAction {
        targets: vec![target("#new")],
        location: location(parent, 0),
        element: ActionElement {
            selector: "#new".to_string(),
            tag_name: "div".to_string(),
            uuid: "new".to_string(),
            ..Default::default()
        },
        edit_text: false,
        code_block: None,
    })
}

#[tokio::test(start_paused = true)]
async fn test_actions_are_written_in_submission_order() {
    let mut h = Harness::new(
        arena(&[("#a", "a.tsx"), ("#b", "b.tsx"), ("#c", "c.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    h.writer.write(edit_text("#a", "1")).unwrap();
    h.writer.write(edit_text("#b", "2")).unwrap();
    h.writer.write(edit_text("#c", "3")).unwrap();
    h.writer.wait_idle().await.unwrap();

    let order: Vec<String> = h
        .differ
        .calls()
        .iter()
        .map(|(_, requests)| requests[0].selector.clone())
        .collect();
    assert_eq!(order, vec!["#a", "#b", "#c"]);

    let seqs: Vec<u64> = h.reports().iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_cycles_never_overlap() {
    let h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::with_latency(Duration::from_millis(2500)),
        FakeWriter::new(true),
    );

    for i in 0..5 {
        h.writer.write(edit_text("#a", &i.to_string())).unwrap();
    }
    h.writer.wait_idle().await.unwrap();

    assert_eq!(h.differ.calls().len(), 5);
    assert_eq!(h.differ.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cycles_are_separated_by_cooldown() {
    let h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    for i in 0..5 {
        h.writer.write(edit_text("#a", &i.to_string())).unwrap();
    }
    h.writer.wait_idle().await.unwrap();

    let starts: Vec<Instant> = h.differ.calls().iter().map(|(at, _)| *at).collect();
    assert_eq!(starts.len(), 5);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= COOLDOWN);
    }
}

#[tokio::test(start_paused = true)]
async fn test_submit_during_cycle_only_enqueues() {
    let mut h = Harness::new(
        arena(&[("#a", "a.tsx"), ("#b", "b.tsx")]),
        FakeDiffer::with_latency(Duration::from_millis(300)),
        FakeWriter::new(true),
    );

    h.writer.write(edit_text("#a", "first")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.writer.state(), SchedulerState::Running);

    h.writer.write(edit_text("#b", "second")).unwrap();
    assert_eq!(h.writer.pending(), 2);
    h.writer.wait_idle().await.unwrap();

    assert_eq!(h.differ.max_in_flight.load(Ordering::SeqCst), 1);
    let kinds: Vec<bool> = h.reports().iter().map(|r| r.outcome.is_written()).collect();
    assert_eq!(kinds, vec![true, true]);
}

#[tokio::test(start_paused = true)]
async fn test_style_targets_on_same_anchor_make_one_request() {
    let mut anchors = arena(&[("#a", "a.tsx")]);
    let id = anchors.lookup("#a").unwrap().id;
    anchors.alias("#a-2", id);

    let h = Harness::new(anchors, FakeDiffer::default(), FakeWriter::new(true));
    h.writer.write(update_style(&["#a", "#a-2"], "red")).unwrap();
    h.writer.wait_idle().await.unwrap();

    let calls = h.differ.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.len(), 1);
    assert_eq!(calls[0].1[0].style_changes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unresolved_action_skips_diff_request() {
    let mut h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    h.writer.write(edit_text("#missing", "x")).unwrap();
    h.writer.wait_idle().await.unwrap();

    assert!(h.differ.calls().is_empty());
    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0].outcome, CycleOutcome::Skipped { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_empty_diff_fails_without_applying() {
    let mut h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::empty(),
        FakeWriter::new(true),
    );

    h.writer.write(edit_text("#a", "x")).unwrap();
    h.writer.wait_idle().await.unwrap();

    assert_eq!(h.differ.calls().len(), 1);
    assert!(h.applier.batches().is_empty());
    let events = h.drain_events();
    assert!(matches!(
        &events[..],
        [WriteEvent::CycleFinished(CycleReport {
            outcome: CycleOutcome::Failed { .. },
            ..
        })]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_apply_failure_skips_settle_and_cleanup() {
    let mut h = Harness::new(
        arena(&[("#parent", "app.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(false),
    );

    h.writer.write(insert_into("#parent")).unwrap();
    h.writer.wait_idle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(h.applier.batches().len(), 1);
    assert!(h.cleaner.calls().is_empty());
    let events = h.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        WriteEvent::CycleFinished(CycleReport {
            outcome: CycleOutcome::Failed { .. },
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_diff_service_error_fails_cycle_without_applying() {
    let mut h = Harness::new(
        arena(&[("#parent", "app.tsx")]),
        FakeDiffer::failing_first(),
        FakeWriter::new(true),
    );

    h.writer.write(insert_into("#parent")).unwrap();
    h.writer.write(insert_into("#parent")).unwrap();
    h.writer.wait_idle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(h.differ.calls().len(), 2);
    assert_eq!(h.applier.batches().len(), 1);
    assert_eq!(h.cleaner.calls(), vec![vec!["app.tsx".to_string()]]);

    let events = h.drain_events();
    let settled: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            WriteEvent::Settled(settled) => Some(settled.seq),
            _ => None,
        })
        .collect();
    assert_eq!(settled, vec![1]);

    let reports: Vec<&CycleReport> = events
        .iter()
        .filter_map(|event| match event {
            WriteEvent::CycleFinished(report) => Some(report),
            _ => None,
        })
        .collect();
    assert!(matches!(
        &reports[0].outcome,
        CycleOutcome::Failed { error } if error.contains("service unavailable")
    ));
    assert!(reports[1].outcome.is_written());
}

#[tokio::test(start_paused = true)]
async fn test_apply_error_fails_cycle_without_settle_or_cleanup() {
    let mut h = Harness::new(
        arena(&[("#parent", "app.tsx")]),
        FakeDiffer::default(),
        FakeWriter::erroring_first(),
    );

    h.writer.write(insert_into("#parent")).unwrap();
    h.writer.wait_idle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert!(h.cleaner.calls().is_empty());
    let events = h.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        WriteEvent::CycleFinished(CycleReport {
            outcome: CycleOutcome::Failed { error },
            ..
        }) if error.contains("disk full")
    ));

    h.writer.write(edit_text("#parent", "next")).unwrap();
    h.writer.wait_idle().await.unwrap();
    assert_eq!(h.applier.batches().len(), 2);
    assert!(h.reports()[0].outcome.is_written());
}

#[tokio::test(start_paused = true)]
async fn test_panicking_boundary_fails_only_its_cycle() {
    let mut h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::panicking_first(),
        FakeWriter::new(true),
    );

    h.writer.write(edit_text("#a", "1")).unwrap();
    h.writer.write(edit_text("#a", "2")).unwrap();
    h.writer.wait_idle().await.unwrap();

    let reports = h.reports();
    assert_eq!(reports.len(), 2);
    assert!(matches!(reports[0].outcome, CycleOutcome::Failed { .. }));
    assert!(reports[1].outcome.is_written());
    assert_eq!(h.writer.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_does_not_block_queue() {
    let mut h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    h.writer.write(edit_text("#missing", "x")).unwrap();
    h.writer
        .write(Action::UngroupElements(UngroupElementsAction {
            targets: vec![],
            location: location("#a", 0),
            surface_id: "main".to_string(),
        }))
        .unwrap();
    h.writer.write(edit_text("#a", "y")).unwrap();
    h.writer.wait_idle().await.unwrap();

    let reports = h.reports();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[1].kind, ActionKind::UngroupElements);
    assert!(matches!(reports[1].outcome, CycleOutcome::Skipped { .. }));
    assert!(reports[2].outcome.is_written());
}

#[tokio::test(start_paused = true)]
async fn test_successful_insert_settles_and_cleans() {
    let mut h = Harness::new(
        arena(&[("#parent", "app.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    h.writer.write(insert_into("#parent")).unwrap();
    h.writer.wait_idle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(h.cleaner.calls(), vec![vec!["app.tsx".to_string()]]);

    let events = h.drain_events();
    let settled: Vec<&SettledEvent> = events
        .iter()
        .filter_map(|event| match event {
            WriteEvent::Settled(settled) => Some(settled),
            _ => None,
        })
        .collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].files, vec!["app.tsx"]);
    assert!(events
        .iter()
        .any(|event| matches!(event, WriteEvent::CleanupFlushed { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_inserts_cleans_every_touched_file() {
    let h = Harness::new(
        arena(&[("#a", "a.tsx"), ("#b", "b.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    h.writer.write(insert_into("#a")).unwrap();
    h.writer.write(insert_into("#b")).unwrap();
    h.writer.wait_idle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let calls = h.cleaner.calls();
    let all: HashSet<String> = calls.iter().flatten().cloned().collect();
    assert_eq!(all, HashSet::from(["a.tsx".to_string(), "b.tsx".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn test_style_and_text_writes_do_not_mark_dirty() {
    let h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    h.writer.write(update_style(&["#a"], "red")).unwrap();
    h.writer.write(edit_text("#a", "hello")).unwrap();
    h.writer.wait_idle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(h.applier.batches().len(), 2);
    assert!(h.cleaner.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_move_request_carries_child_anchor() {
    let anchors = arena(&[("#parent", "app.tsx"), ("#child", "app.tsx")]);
    let child_id = anchors.lookup("#child").unwrap().id;
    let h = Harness::new(anchors, FakeDiffer::default(), FakeWriter::new(true));

    h.writer
        .write(Action::MoveElement(MoveElementAction {
            targets: vec![target("#child")],
            location: MoveActionLocation {
                location: location("#parent", 0),
                original_index: 2,
            },
        }))
        .unwrap();
    h.writer.wait_idle().await.unwrap();

    let calls = h.differ.calls();
    let moved = &calls[0].1[0].moved_elements[0];
    assert_eq!(moved.anchor.id, child_id);
    assert_eq!(moved.original_index(), 2);
    assert_eq!(moved.destination_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drains_queue() {
    let h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    h.writer.write(edit_text("#a", "1")).unwrap();
    h.writer.write(edit_text("#a", "2")).unwrap();
    let applier = h.applier.clone();
    h.writer.shutdown().await;

    assert_eq!(applier.batches().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_view_source_and_code_block() {
    let h = Harness::new(
        arena(&[("#a", "a.tsx")]),
        FakeDiffer::default(),
        FakeWriter::new(true),
    );

    h.writer.view_source("#a").await.unwrap();
    h.writer.view_source("#missing").await.unwrap();
    assert_eq!(h.navigator.opened.lock().unwrap().len(), 1);

    let block = h.writer.code_block("#a").await.unwrap();
    assert_eq!(block.as_deref(), Some("<div /> // a.tsx"));
    assert!(h.writer.code_block("#missing").await.unwrap().is_none());
}

#[test]
fn test_action_log_roundtrip() {
    let action = update_style(&["#a"], "red");
    let json = serde_json::to_string(&action).unwrap();
    let restored: Action = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, action);
}
