//! Limner Core
//!
//! Turns a plan of images into edits of a note, safely:
//! - [`mutator`]: block injection, removal and replacement with an
//!   optimistic-concurrency fingerprint check
//! - [`poller`]: bounded create-then-poll driver for image jobs
//! - [`undo`]: removal of the newest batch (or all batches) and image cleanup
//! - [`pipeline`]: the end-to-end generate and regenerate flows
//!
//! External services and storage are reached through the traits in
//! [`traits`]; filesystem implementations live in [`vault`] and [`backup`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backup;
pub mod error;
pub mod filename;
pub mod mutator;
pub mod pipeline;
pub mod poller;
pub mod traits;
pub mod types;
pub mod undo;
pub mod vault;

// Re-export main types for convenience
pub use backup::JsonBackupStore;
pub use error::{
    codes, DocumentError, DocumentResult, JobError, JobResult, LimnerError, LimnerResult,
    ServiceError, ServiceResult, StorageError, StorageResult,
};
pub use filename::{artifact_filename, artifact_path, sanitize_filename};
pub use mutator::{check_fingerprint, inject, remove, replace_block, BlockSelection, Removal};
pub use pipeline::{BatchReport, ImagePipeline, ItemFailure, RegenerateReport};
pub use poller::{JobPoller, PollPolicy, PollProgress};
pub use traits::{
    ArtifactStore, BackupStore, ImageJobApi, ImageJobRequest, JobHandle, JobStatus, NoteBackup,
    NoteStore, NoopReporter, Plan, PlanItem, PlanRequest, Planner, PollableJob, ProgressEvent,
    ProgressReporter,
};
pub use types::{GeneratedArtifact, InsertionTarget};
pub use undo::{clear_all, undo_last, UndoReport, UndoService};
pub use vault::{FsArtifactStore, FsNoteStore};

// Document structure and settings, for callers that only depend on core
pub use limner_config as config;
pub use limner_parser as parser;
