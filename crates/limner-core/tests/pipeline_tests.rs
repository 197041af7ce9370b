//! Pipeline and undo tests against in-memory services

use async_trait::async_trait;
use limner_core::config::LimnerConfig;
use limner_core::parser::find_all_blocks;
use limner_core::{
    ArtifactStore, BackupStore, ImageJobApi, ImageJobRequest, ImagePipeline, JobHandle,
    JobStatus, JsonBackupStore, NoteStore, Plan, PlanItem, PlanRequest, Planner, PollableJob,
    ProgressEvent, ServiceError, ServiceResult, StorageError, StorageResult, UndoService,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct MemoryNotes {
    notes: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
    // Text swapped in on the given read number, simulating a concurrent edit
    edit_on_read: Mutex<Option<(usize, String)>>,
    fail_writes: AtomicBool,
}

impl MemoryNotes {
    fn with(note: &str, text: &str) -> Arc<Self> {
        let store = Self::default();
        store
            .notes
            .lock()
            .unwrap()
            .insert(note.to_string(), text.to_string());
        Arc::new(store)
    }

    fn text(&self, note: &str) -> String {
        self.notes.lock().unwrap()[note].clone()
    }
}

#[async_trait]
impl NoteStore for MemoryNotes {
    async fn read(&self, note: &str) -> StorageResult<String> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, text)) = self.edit_on_read.lock().unwrap().clone() {
            if at == n {
                self.notes.lock().unwrap().insert(note.to_string(), text);
            }
        }
        self.notes.lock().unwrap().get(note).cloned().ok_or_else(|| {
            StorageError::io(
                "Failed to read",
                note,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )
        })
    }

    async fn write(&self, note: &str, text: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::io(
                "Failed to write",
                note,
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ));
        }
        self.notes
            .lock()
            .unwrap()
            .insert(note.to_string(), text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryArtifacts {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifacts {
    fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.files.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifacts {
    async fn save(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        match self.files.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(StorageError::io(
                "Failed to delete",
                path,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )),
        }
    }

    async fn exists(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }
}

struct FixedPlanner {
    items: Vec<PlanItem>,
    requests: Mutex<Vec<PlanRequest>>,
}

impl FixedPlanner {
    fn new(items: Vec<PlanItem>) -> Arc<Self> {
        Arc::new(Self {
            items,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Planner for FixedPlanner {
    async fn plan(&self, request: &PlanRequest) -> ServiceResult<Plan> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Plan {
            items: self.items.clone(),
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Prompts containing "fail" end in a failed job; others complete after one
/// processing poll and return the prompt bytes as the image
#[derive(Default)]
struct ScriptedImages {
    polls: Mutex<HashMap<String, usize>>,
}

#[async_trait]
impl ImageJobApi for ScriptedImages {
    async fn create_job(&self, request: &ImageJobRequest) -> ServiceResult<JobHandle> {
        Ok(JobHandle::new(request.prompt.clone()))
    }

    async fn job_status(&self, handle: &JobHandle) -> ServiceResult<PollableJob> {
        let mut polls = self.polls.lock().unwrap();
        let count = polls.entry(handle.job_id.clone()).or_insert(0);
        *count += 1;
        if handle.job_id.contains("fail") {
            return Ok(PollableJob::failed(&handle.job_id, "content policy"));
        }
        if *count == 1 {
            return Ok(PollableJob::new(&handle.job_id, JobStatus::Processing));
        }
        Ok(PollableJob::completed(
            &handle.job_id,
            format!("mem://{}", handle.job_id),
        ))
    }

    async fn fetch_result(&self, result_ref: &str) -> ServiceResult<Vec<u8>> {
        result_ref
            .strip_prefix("mem://")
            .map(|prompt| prompt.as_bytes().to_vec())
            .ok_or_else(|| ServiceError::invalid_response("unknown result"))
    }
}

fn item(id: &str, heading: &str, prompt: &str) -> PlanItem {
    PlanItem {
        id: id.to_string(),
        title: format!("Title {}", id),
        after_heading: heading.to_string(),
        prompt: prompt.to_string(),
        description: format!("Caption {}", id),
    }
}

struct Harness {
    notes: Arc<MemoryNotes>,
    artifacts: Arc<MemoryArtifacts>,
    planner: Arc<FixedPlanner>,
    pipeline: ImagePipeline,
}

fn harness(text: &str, items: Vec<PlanItem>) -> Harness {
    let notes = MemoryNotes::with("note.md", text);
    let artifacts = Arc::new(MemoryArtifacts::default());
    let planner = FixedPlanner::new(items);
    let pipeline = ImagePipeline::new(
        planner.clone(),
        Arc::new(ScriptedImages::default()),
        notes.clone(),
        artifacts.clone(),
        &LimnerConfig::default(),
    );
    Harness {
        notes,
        artifacts,
        planner,
        pipeline,
    }
}

fn collect_events() -> (Arc<Mutex<Vec<ProgressEvent>>>, impl Fn(ProgressEvent) + Send + Sync) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (events, move |event| sink.lock().unwrap().push(event))
}

const NOTE: &str = "# Intro\nhello\n\n## 2. Details\nmore\n---\nfooter\n# End\nbye";

// ============================================================================
// Generation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_injects_blocks_under_their_sections() {
    let h = harness(
        NOTE,
        vec![item("img1", "Intro", "draw intro"), item("img2", "Details", "draw details")],
    );
    let (events, reporter) = collect_events();

    let report = h.pipeline.run("note.md", &reporter).await.unwrap();
    assert_eq!(report.planned, 2);
    assert_eq!(report.generated.len(), 2);
    assert!(report.failures.is_empty());
    assert!(report.fallbacks.is_empty());

    let text = h.notes.text("note.md");
    let lines: Vec<&str> = text.lines().collect();
    let pos = |needle: &str| lines.iter().position(|l| l.contains(needle)).unwrap();
    assert!(pos("id=\"img1\"") < pos("## 2. Details"));
    assert!(pos("id=\"img2\"") > pos("more"));
    assert!(pos("id=\"img2\"") < pos("---"));

    let blocks = find_all_blocks(&text);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].generated_at, blocks[1].generated_at);
    assert_eq!(blocks[0].source_prompt().as_deref(), Some("draw intro"));
    assert_eq!(blocks[0].caption(), Some("Caption img1"));
    assert_eq!(h.artifacts.paths().len(), 2);

    let events = events.lock().unwrap();
    assert_eq!(events.first(), Some(&ProgressEvent::Planning));
    assert_eq!(events.last(), Some(&ProgressEvent::Done { count: 2 }));
    let polling = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Polling { .. }))
        .count();
    assert_eq!(polling, 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_item_is_skipped() {
    let h = harness(
        NOTE,
        vec![item("ok", "Intro", "draw ok"), item("bad", "End", "please fail")],
    );

    let report = h
        .pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();
    assert_eq!(report.generated.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "bad");
    assert_eq!(report.failures[0].code, "JOB_FAILED");
    assert_eq!(find_all_blocks(&h.notes.text("note.md")).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unusable_block_id_skips_only_that_item() {
    let h = harness(
        NOTE,
        vec![item("img1", "Intro", "draw intro"), item("bad-->id", "End", "draw end")],
    );

    let report = h
        .pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();
    assert_eq!(report.generated.len(), 1);
    assert_eq!(report.generated[0].id, "img1");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "bad-->id");
    assert_eq!(report.failures[0].code, "INVALID_BLOCK");

    let blocks = find_all_blocks(&h.notes.text("note.md"));
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, "img1");
    assert_eq!(
        h.artifacts.paths(),
        [report.generated[0].storage_path.clone()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_nothing_generated_leaves_note_untouched() {
    let h = harness(NOTE, vec![item("bad", "Intro", "fail")]);
    let (events, reporter) = collect_events();

    let report = h.pipeline.run("note.md", &reporter).await.unwrap();
    assert!(report.is_empty());
    assert_eq!(h.notes.text("note.md"), NOTE);
    assert!(matches!(
        events.lock().unwrap().last(),
        Some(ProgressEvent::Failed { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_heading_falls_back_to_last_section() {
    let h = harness(NOTE, vec![item("img", "Nowhere", "draw")]);
    let report = h
        .pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();
    assert_eq!(report.fallbacks, ["img"]);

    let text = h.notes.text("note.md");
    let bye = text.lines().position(|l| l == "bye").unwrap();
    let block = text.lines().position(|l| l.contains("id=\"img\"")).unwrap();
    assert!(block > bye);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_edit_is_a_conflict() {
    let h = harness(NOTE, vec![item("img", "Intro", "draw")]);
    // Read 1 is the initial read; read 2 happens right before injection
    *h.notes.edit_on_read.lock().unwrap() = Some((2, format!("{}\nedited", NOTE)));

    let err = h
        .pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.code(), "CONFLICT");
    assert_eq!(h.notes.text("note.md"), format!("{}\nedited", NOTE));
    assert!(h.artifacts.paths().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_note_write_removes_saved_images() {
    let h = harness(
        NOTE,
        vec![item("img1", "Intro", "draw intro"), item("img2", "End", "draw end")],
    );
    h.notes.fail_writes.store(true, Ordering::SeqCst);

    let err = h
        .pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STORAGE");
    assert_eq!(h.notes.text("note.md"), NOTE);
    assert!(h.artifacts.paths().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_titles_get_distinct_files() {
    let mut first = item("a", "Intro", "one");
    let mut second = item("b", "End", "two");
    first.title = "Same".into();
    second.title = "Same".into();
    let h = harness(NOTE, vec![first, second]);

    h.pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();
    let paths = h.artifacts.paths();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.starts_with("attachments/ai-summary/")));
    assert!(paths.iter().any(|p| p.ends_with("_Same.png")));
    assert!(paths.iter().any(|p| p.ends_with("_Same_b.png")));
}

#[tokio::test(start_paused = true)]
async fn test_planner_receives_excerpt_and_settings() {
    let h = harness("---\ntags: [x]\n---\n# T\nbody", vec![item("i", "T", "p")]);
    h.pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();

    let requests = h.planner.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].excerpt, "# T\nbody");
    assert_eq!(requests[0].image_count, 4);
}

#[tokio::test(start_paused = true)]
async fn test_backup_is_saved_before_injection() {
    let dir = tempfile::tempdir().unwrap();
    let backups = Arc::new(JsonBackupStore::in_vault(dir.path(), 5));
    let notes = MemoryNotes::with("note.md", NOTE);
    let pipeline = ImagePipeline::new(
        FixedPlanner::new(vec![item("img", "Intro", "draw")]),
        Arc::new(ScriptedImages::default()),
        notes.clone(),
        Arc::new(MemoryArtifacts::default()),
        &LimnerConfig::default(),
    )
    .with_backups(backups.clone());

    let report = pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();
    let backup = backups.latest("note.md").await.unwrap().unwrap();
    assert_eq!(backup.content, NOTE);
    assert_eq!(backup.injected_images, [report.generated[0].storage_path.clone()]);
}

// ============================================================================
// Regeneration and undo
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_regenerate_replaces_block_in_place() {
    let h = harness(NOTE, vec![item("img1", "Intro", "draw intro")]);
    h.pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();
    let before = h.notes.text("note.md");
    let old = find_all_blocks(&before).remove(0);
    let line = old.span.unwrap().start + 1;

    let report = h
        .pipeline
        .regenerate("note.md", line, &limner_core::NoopReporter)
        .await
        .unwrap();
    assert_eq!(report.id, "img1");
    assert_ne!(Some(report.artifact_path.clone()), old.artifact_ref());
    assert_eq!(report.previous_path, old.artifact_ref());
    assert_eq!(h.artifacts.paths(), [report.artifact_path.clone()]);

    let after = h.notes.text("note.md");
    let blocks = find_all_blocks(&after);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].artifact_ref(), Some(report.artifact_path));
    assert_eq!(blocks[0].caption(), Some("Caption img1"));
    assert_eq!(blocks[0].source_prompt().as_deref(), Some("draw intro"));
    assert_eq!(after.lines().count(), before.lines().count());
}

#[tokio::test(start_paused = true)]
async fn test_regenerate_conflict_keeps_old_image() {
    let h = harness(NOTE, vec![item("img1", "Intro", "draw intro")]);
    h.pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();
    let before = h.notes.text("note.md");
    let old = find_all_blocks(&before).remove(0);
    let old_path = old.artifact_ref().unwrap();
    let old_bytes = h.artifacts.files.lock().unwrap()[&old_path].clone();

    // Regenerate reads the note three times; the edit lands on the last read
    let final_read = h.notes.reads.load(Ordering::SeqCst) + 3;
    let edited = format!("{}\nedited", before);
    *h.notes.edit_on_read.lock().unwrap() = Some((final_read, edited.clone()));

    let err = h
        .pipeline
        .regenerate("note.md", old.span.unwrap().start, &limner_core::NoopReporter)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(h.notes.text("note.md"), edited);
    assert_eq!(h.artifacts.paths(), [old_path.clone()]);
    assert_eq!(h.artifacts.files.lock().unwrap()[&old_path], old_bytes);
}

#[tokio::test(start_paused = true)]
async fn test_regenerate_outside_block_fails() {
    let h = harness(NOTE, vec![]);
    let err = h
        .pipeline
        .regenerate("note.md", 0, &limner_core::NoopReporter)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NO_BLOCK_AT_LINE");
}

#[tokio::test(start_paused = true)]
async fn test_undo_service_removes_batch_and_files() {
    let h = harness(
        NOTE,
        vec![item("img1", "Intro", "a"), item("img2", "End", "b")],
    );
    h.pipeline
        .run("note.md", &limner_core::NoopReporter)
        .await
        .unwrap();
    assert_eq!(h.artifacts.paths().len(), 2);

    // One file already gone: reported, not fatal
    let first = h.artifacts.paths()[0].clone();
    h.artifacts.delete(&first).await.unwrap();

    let undo = UndoService::new(h.notes.clone(), h.artifacts.clone());
    let report = undo.undo_last("note.md").await.unwrap();
    assert_eq!(report.removed_count, 2);
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.failed_deletes, [first]);
    assert_eq!(h.notes.text("note.md"), NOTE);
    assert!(h.artifacts.paths().is_empty());

    let again = undo.clear_all("note.md").await.unwrap();
    assert!(again.is_noop());
}
