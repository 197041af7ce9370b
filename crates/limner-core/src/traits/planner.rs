//! Planning service abstraction

use async_trait::async_trait;
use limner_config::{GenerationConfig, ImageStyle, Language};
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;

/// What the planner is asked for
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    /// Note excerpt within the character budget
    pub excerpt: String,
    /// Number of images wanted
    pub image_count: u32,
    /// Visual style preset
    pub style: ImageStyle,
    /// Language for titles and captions
    pub language: Language,
}

impl PlanRequest {
    /// Build a request from generation settings
    pub fn new(excerpt: impl Into<String>, settings: &GenerationConfig) -> Self {
        Self {
            excerpt: excerpt.into(),
            image_count: settings.image_count,
            style: settings.style,
            language: settings.language,
        }
    }
}

/// One planned image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    /// Identifier, unique within the plan
    pub id: String,
    /// Short title, used for the file name
    pub title: String,
    /// Heading text the image should follow (may be inexact)
    pub after_heading: String,
    /// Image generation prompt
    pub prompt: String,
    /// One-line caption
    #[serde(default)]
    pub description: String,
}

/// Ordered placement plan for a note
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Planned images in generation order
    pub items: Vec<PlanItem>,
}

impl Plan {
    /// Drop items with duplicate ids, keeping the first
    pub fn dedup_ids(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.items.retain(|item| seen.insert(item.id.clone()));
        self
    }
}

/// Produces a placement plan for a note excerpt
#[async_trait]
pub trait Planner: Send + Sync {
    /// Ask for a plan
    async fn plan(&self, request: &PlanRequest) -> ServiceResult<Plan>;

    /// Name used in logs
    fn name(&self) -> &str;
}
