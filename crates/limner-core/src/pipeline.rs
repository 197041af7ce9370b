//! End-to-end illustration of a note
//!
//! [`ImagePipeline::run`] reads a note, asks the planner where images belong,
//! generates them one at a time, saves them to the vault and injects the
//! blocks with an optimistic-concurrency check against the text first read.
//! A failing image is skipped; a conflict aborts the injection.

use chrono::{DateTime, Utc};
use limner_config::{GenerationConfig, LimnerConfig, StorageConfig};
use limner_parser::{
    block_at_line, excerpt, parse, resolve, validate_block_id, ContentBlock, Fingerprint,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{codes, DocumentError, LimnerError, LimnerResult};
use crate::filename::{artifact_filename, artifact_path, sanitize_filename};
use crate::mutator::{check_fingerprint, inject, replace_block};
use crate::poller::{JobPoller, PollPolicy, PollProgress};
use crate::traits::{
    ArtifactStore, BackupStore, ImageJobApi, ImageJobRequest, NoteBackup, NoteStore, PlanItem,
    PlanRequest, Planner, ProgressEvent, ProgressReporter,
};
use crate::types::{GeneratedArtifact, InsertionTarget};

/// A plan item that produced no image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Plan item id
    pub id: String,
    /// Plan item title
    pub title: String,
    /// Error code (e.g. `JOB_TIMEOUT`)
    pub code: String,
    /// Error message
    pub message: String,
}

/// Outcome of [`ImagePipeline::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items in the plan
    pub planned: usize,
    /// Images saved and injected, in plan order
    pub generated: Vec<GeneratedArtifact>,
    /// Items that were skipped
    pub failures: Vec<ItemFailure>,
    /// Ids whose heading was not found and went to the last section
    pub fallbacks: Vec<String>,
}

impl BatchReport {
    /// True when nothing was injected
    pub fn is_empty(&self) -> bool {
        self.generated.is_empty()
    }
}

/// Outcome of [`ImagePipeline::regenerate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerateReport {
    /// Block id
    pub id: String,
    /// Path of the new image
    pub artifact_path: String,
    /// Previous image, deleted when it differs from the new path
    pub previous_path: Option<String>,
}

/// Orchestrates planning, generation, storage and injection
pub struct ImagePipeline {
    planner: Arc<dyn Planner>,
    images: Arc<dyn ImageJobApi>,
    notes: Arc<dyn NoteStore>,
    artifacts: Arc<dyn ArtifactStore>,
    backups: Option<Arc<dyn BackupStore>>,
    generation: GenerationConfig,
    storage: StorageConfig,
    poller: JobPoller,
}

impl ImagePipeline {
    /// Create a pipeline; backups are off until [`Self::with_backups`]
    pub fn new(
        planner: Arc<dyn Planner>,
        images: Arc<dyn ImageJobApi>,
        notes: Arc<dyn NoteStore>,
        artifacts: Arc<dyn ArtifactStore>,
        config: &LimnerConfig,
    ) -> Self {
        Self {
            planner,
            images,
            notes,
            artifacts,
            backups: None,
            generation: config.generation.clone(),
            storage: config.storage.clone(),
            poller: JobPoller::new(PollPolicy::from(&config.polling)),
        }
    }

    /// Snapshot notes before injecting (when `storage.create_backup` is set)
    pub fn with_backups(mut self, backups: Arc<dyn BackupStore>) -> Self {
        self.backups = Some(backups);
        self
    }

    /// Illustrate `note`
    ///
    /// Returns an empty report without touching the note when no image could
    /// be generated.
    pub async fn run(
        &self,
        note: &str,
        reporter: &dyn ProgressReporter,
    ) -> LimnerResult<BatchReport> {
        let result = self.run_batch(note, reporter).await;
        if let Err(err) = &result {
            error!(note, code = err.code(), error = %err, "generation failed");
            reporter.report(ProgressEvent::Failed {
                message: err.to_string(),
            });
        }
        result
    }

    async fn run_batch(
        &self,
        note: &str,
        reporter: &dyn ProgressReporter,
    ) -> LimnerResult<BatchReport> {
        let text = self.notes.read(note).await?;
        let token = Fingerprint::of(&text);
        let doc = parse(&text);
        if doc.is_empty() {
            warn!(code = codes::PARSE_EMPTY, note, "note has no sections");
        }

        if self.storage.create_backup {
            if let Some(backups) = &self.backups {
                backups.save(NoteBackup::new(note, text.as_str())).await?;
            }
        }

        reporter.report(ProgressEvent::Planning);
        let request = PlanRequest::new(
            excerpt(&doc, self.generation.max_characters),
            &self.generation,
        );
        let plan = self
            .planner
            .plan(&request)
            .await
            .map_err(LimnerError::Plan)?
            .dedup_ids();
        info!(
            note,
            planner = self.planner.name(),
            items = plan.items.len(),
            "plan received"
        );

        let now = Utc::now();
        let total = plan.items.len();
        let mut report = BatchReport {
            planned: total,
            ..BatchReport::default()
        };
        let mut placed: Vec<(&PlanItem, GeneratedArtifact)> = Vec::new();
        let mut used_paths = HashSet::new();

        for (i, item) in plan.items.iter().enumerate() {
            let index = i + 1;
            reporter.report(ProgressEvent::Generating {
                index,
                total,
                title: item.title.clone(),
            });
            match self
                .generate_item(item, index, total, now, &mut used_paths, reporter)
                .await
            {
                Ok(artifact) => placed.push((item, artifact)),
                Err(err) => {
                    warn!(id = %item.id, code = err.code(), error = %err, "skipping image");
                    report.failures.push(ItemFailure {
                        id: item.id.clone(),
                        title: item.title.clone(),
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if placed.is_empty() {
            reporter.report(ProgressEvent::Failed {
                message: "No images were generated".to_string(),
            });
            return Ok(report);
        }

        reporter.report(ProgressEvent::Injecting {
            count: placed.len(),
        });
        let targets: Vec<InsertionTarget> = placed
            .into_iter()
            .map(|(item, artifact)| {
                let resolution = resolve(&doc, &item.after_heading);
                if resolution.is_fallback() {
                    warn!(
                        code = codes::RESOLUTION_FALLBACK,
                        id = %item.id,
                        heading = %item.after_heading,
                        "heading not found"
                    );
                    report.fallbacks.push(item.id.clone());
                }
                InsertionTarget::new(resolution.line, artifact)
            })
            .collect();
        report.generated = targets.iter().map(|t| t.artifact.clone()).collect();

        if let Err(err) = self.commit(note, &token, &targets, now).await {
            self.discard(report.generated.iter().map(|a| a.storage_path.as_str()))
                .await;
            return Err(err);
        }

        if self.storage.create_backup {
            if let Some(backups) = &self.backups {
                for artifact in &report.generated {
                    if let Err(err) = backups.record_image(note, &artifact.storage_path).await {
                        warn!(error = %err, "failed to record image in backup");
                    }
                }
            }
        }

        reporter.report(ProgressEvent::Done {
            count: report.generated.len(),
        });
        info!(
            note,
            generated = report.generated.len(),
            skipped = report.failures.len(),
            "images injected"
        );
        Ok(report)
    }

    /// Re-read the note, inject against the first-read fingerprint and write
    async fn commit(
        &self,
        note: &str,
        token: &Fingerprint,
        targets: &[InsertionTarget],
        now: DateTime<Utc>,
    ) -> LimnerResult<()> {
        let current = self.notes.read(note).await?;
        let updated = inject(&current, Some(token), targets, now)?;
        self.notes.write(note, &updated).await?;
        Ok(())
    }

    async fn generate_item(
        &self,
        item: &PlanItem,
        index: usize,
        total: usize,
        now: DateTime<Utc>,
        used_paths: &mut HashSet<String>,
        reporter: &dyn ProgressReporter,
    ) -> LimnerResult<GeneratedArtifact> {
        validate_block_id(&item.id).map_err(DocumentError::from)?;
        let bytes = self
            .generate_bytes(&item.prompt, index, total, reporter)
            .await?;

        reporter.report(ProgressEvent::Saving { index, total });
        let stem = if item.title.trim().is_empty() {
            &item.id
        } else {
            &item.title
        };
        let path = self.unique_path(stem, &item.id, now, used_paths).await;
        ContentBlock::new(&item.id, now, Some(&item.prompt), &path, &item.description)
            .map_err(DocumentError::from)?;
        self.artifacts.save(&path, &bytes).await?;

        Ok(GeneratedArtifact {
            id: item.id.clone(),
            storage_path: path,
            title: item.title.clone(),
            description: item.description.clone(),
            source_prompt: Some(item.prompt.clone()),
        })
    }

    async fn generate_bytes(
        &self,
        prompt: &str,
        index: usize,
        total: usize,
        reporter: &dyn ProgressReporter,
    ) -> LimnerResult<Vec<u8>> {
        let request = ImageJobRequest::new(prompt, &self.generation);
        let bytes = self
            .poller
            .generate_image(self.images.as_ref(), &request, |progress: PollProgress| {
                reporter.report(ProgressEvent::Polling {
                    index,
                    total,
                    attempt: progress.attempt,
                    percent: progress.percent(),
                    message: progress.message(),
                })
            })
            .await?;
        Ok(bytes)
    }

    /// First free `{date}_{stem}[_{id}[_{n}]].{ext}` in the attachment folder
    async fn unique_path(
        &self,
        stem: &str,
        id: &str,
        now: DateTime<Utc>,
        used_paths: &mut HashSet<String>,
    ) -> String {
        let ext = self.generation.output_format.extension();
        let id = sanitize_filename(id);
        let mut candidates = vec![stem.to_string(), format!("{}_{}", stem, id)];
        candidates.extend((2..100).map(|n| format!("{}_{}_{}", stem, id, n)));

        for candidate in &candidates {
            let path = artifact_path(
                &self.storage.attachment_folder,
                &artifact_filename(now, candidate, ext),
            );
            if !used_paths.contains(&path) && !self.artifacts.exists(&path).await {
                used_paths.insert(path.clone());
                return path;
            }
        }

        // Every candidate is taken; overwrite the last one
        let path = artifact_path(
            &self.storage.attachment_folder,
            &artifact_filename(now, &format!("{}_{}", stem, id), ext),
        );
        used_paths.insert(path.clone());
        path
    }

    async fn discard<'a>(&self, paths: impl IntoIterator<Item = &'a str>) {
        for path in paths {
            if let Err(err) = self.artifacts.delete(path).await {
                warn!(
                    code = codes::ARTIFACT_DELETE_FAILED,
                    path,
                    error = %err,
                    "failed to delete image file"
                );
            }
        }
    }

    /// Regenerate the block spanning `line` (0-based, front matter included)
    ///
    /// The block keeps its id and caption and gets a fresh timestamp. The new
    /// image is saved under a new name; the old file is deleted only once the
    /// note has been written.
    pub async fn regenerate(
        &self,
        note: &str,
        line: usize,
        reporter: &dyn ProgressReporter,
    ) -> LimnerResult<RegenerateReport> {
        let result = self.regenerate_block(note, line, reporter).await;
        if let Err(err) = &result {
            error!(note, line, code = err.code(), error = %err, "regeneration failed");
            reporter.report(ProgressEvent::Failed {
                message: err.to_string(),
            });
        }
        result
    }

    async fn regenerate_block(
        &self,
        note: &str,
        line: usize,
        reporter: &dyn ProgressReporter,
    ) -> LimnerResult<RegenerateReport> {
        let text = self.notes.read(note).await?;
        let token = Fingerprint::of(&text);
        let block = block_at_line(&text, line).ok_or(DocumentError::NoBlockAtLine(line))?;
        let prompt = block
            .source_prompt()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| DocumentError::MissingPrompt(block.id.clone()))?;
        let caption = block.caption().unwrap_or_default().to_string();

        reporter.report(ProgressEvent::Generating {
            index: 1,
            total: 1,
            title: if caption.is_empty() {
                block.id.clone()
            } else {
                caption.clone()
            },
        });
        let bytes = self.generate_bytes(&prompt, 1, 1, reporter).await?;

        check_fingerprint(&self.notes.read(note).await?, Some(&token))?;
        reporter.report(ProgressEvent::Saving { index: 1, total: 1 });
        let now = Utc::now();
        let previous = block.artifact_ref();
        let stem = if caption.is_empty() { &block.id } else { &caption };
        let mut taken: HashSet<String> = previous.iter().cloned().collect();
        let path = self.unique_path(stem, &block.id, now, &mut taken).await;
        let replacement = ContentBlock::new(&block.id, now, Some(&prompt), &path, &caption)
            .map_err(DocumentError::from)?;
        self.artifacts.save(&path, &bytes).await?;

        reporter.report(ProgressEvent::Injecting { count: 1 });
        if let Err(err) = self
            .commit_replacement(note, &token, &block, &replacement)
            .await
        {
            self.discard([path.as_str()]).await;
            return Err(err);
        }

        let previous_path = previous.filter(|old| *old != path);
        if let Some(old) = &previous_path {
            if let Err(err) = self.artifacts.delete(old).await {
                warn!(
                    code = codes::ARTIFACT_DELETE_FAILED,
                    path = %old,
                    error = %err,
                    "failed to delete replaced image"
                );
            }
        }

        reporter.report(ProgressEvent::Done { count: 1 });
        info!(note, id = %block.id, path = %path, "image regenerated");
        Ok(RegenerateReport {
            id: block.id,
            artifact_path: path,
            previous_path,
        })
    }

    async fn commit_replacement(
        &self,
        note: &str,
        token: &Fingerprint,
        block: &ContentBlock,
        replacement: &ContentBlock,
    ) -> LimnerResult<()> {
        let current = self.notes.read(note).await?;
        let updated = replace_block(&current, Some(token), block, replacement)?;
        self.notes.write(note, &updated).await?;
        Ok(())
    }
}
