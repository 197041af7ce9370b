//! Seams between the core and the outside world
//!
//! The core defines these traits and orchestrates through them. HTTP clients
//! live in `limner-llm`, filesystem adapters in [`crate::vault`] and
//! [`crate::backup`], and tests plug in in-memory fakes.
//!
//! ```text
//! ┌──────────────────┐
//! │  ImagePipeline   │  ← orchestrates through trait objects
//! │   - Planner      │
//! │   - ImageJobApi  │
//! │   - NoteStore    │
//! │   - ArtifactStore│
//! │   - BackupStore  │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Implementations  │  ← proxy / kie.ai / Gemini clients, vault on disk
//! └──────────────────┘
//! ```

pub mod jobs;
pub mod planner;
pub mod progress;
pub mod store;

// Re-export key traits
pub use jobs::{ImageJobApi, ImageJobRequest, JobHandle, JobStatus, PollableJob};
pub use planner::{Plan, PlanItem, PlanRequest, Planner};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter};
pub use store::{ArtifactStore, BackupStore, NoteBackup, NoteStore};
