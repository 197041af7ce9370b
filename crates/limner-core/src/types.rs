//! Values passed between the pipeline stages

use serde::{Deserialize, Serialize};

/// A generated and saved image, ready to be referenced from a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Plan item id, unique within the batch
    pub id: String,
    /// Vault-relative path of the saved image
    pub storage_path: String,
    /// Short title
    pub title: String,
    /// Caption written under the image
    pub description: String,
    /// Prompt the image was generated from
    pub source_prompt: Option<String>,
}

/// Where one artifact goes: immediately after body line `line`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionTarget {
    /// Body-relative line (front matter excluded)
    pub line: usize,
    /// What to insert
    pub artifact: GeneratedArtifact,
}

impl InsertionTarget {
    /// Create a target
    pub fn new(line: usize, artifact: GeneratedArtifact) -> Self {
        Self { line, artifact }
    }
}
