//! Gemini planner
//!
//! Asks a Gemini text model for a JSON placement plan and pulls the plan out
//! of the reply. Models sometimes wrap the JSON in a fenced block or add prose
//! around it, so the fenced block wins and otherwise the outermost `{...}` is
//! used.

use async_trait::async_trait;
use limner_config::{ConnectionConfig, Language};
use limner_core::{Plan, PlanItem, PlanRequest, Planner, ServiceError, ServiceResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::http::{check_status, read_json, transport};
use crate::style::plan_guidance;

const SERVICE: &str = "Gemini";

static FENCED_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:json)?\s*\n([\s\S]*?)\n?```").expect("fenced json regex is valid")
});
static OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("object regex is valid"));

/// Direct Gemini planning client
pub struct GeminiPlanner {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl GeminiPlanner {
    /// Create a new Gemini planner
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
        }
    }

    /// Create a planner from connection settings
    pub fn from_config(config: &ConnectionConfig, api_key: impl Into<String>) -> Self {
        Self::new(
            api_key,
            config.gemini_endpoint(),
            config.gemini_model(),
            config.timeout(),
        )
    }

    /// Model used for planning
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanOutput {
    items: Option<Vec<PlanItem>>,
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::Ja => "Japanese",
        Language::En => "English",
    }
}

/// Build the planning prompt for a request
pub fn build_plan_prompt(request: &PlanRequest) -> String {
    let count = request.image_count;
    let language = language_name(request.language);
    format!(
        r#"You plan summary images for a Markdown note.
Read the note below and plan exactly {count} images, each explaining one important section.

Return one JSON object and nothing else, using this schema:
{{
  "items": [
    {{
      "id": "img1",
      "title": "Short title",
      "afterHeading": "Heading text copied exactly from the note",
      "prompt": "Detailed image generation prompt",
      "description": "One-line caption"
    }}
  ]
}}

Rules:
- ids are sequential: img1 to img{count}.
- "afterHeading" is copied from a heading in the note. Use "" when the note has no headings.
- Every item covers a different aspect, spread over the whole note.
- Prompts describe a clean, modern {style} image: {guidance}. Keep any text in the image to short labels.
- "title" and "description" are in {language}. Labels inside the image are in {language}.

## Note Content
{note}

Now output the JSON."#,
        count = count,
        style = request.style,
        guidance = plan_guidance(request.style),
        language = language,
        note = request.excerpt,
    )
}

/// Pull a plan out of model text, keeping at most `limit` items
pub fn extract_plan(text: &str, limit: usize) -> ServiceResult<Plan> {
    let json = FENCED_JSON_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .or_else(|| OBJECT_RE.find(text))
        .map(|m| m.as_str())
        .ok_or_else(|| ServiceError::invalid_response("Failed to extract JSON from plan response"))?;

    let output: PlanOutput = serde_json::from_str(json)
        .map_err(|e| ServiceError::invalid_response(format!("Plan JSON is malformed: {}", e)))?;
    let mut items = output
        .items
        .ok_or_else(|| ServiceError::invalid_response("Invalid plan output structure"))?;

    if items.len() > limit {
        debug!(returned = items.len(), limit, "truncating plan");
        items.truncate(limit);
    }
    Ok(Plan { items })
}

#[async_trait]
impl Planner for GeminiPlanner {
    async fn plan(&self, request: &PlanRequest) -> ServiceResult<Plan> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_plan_prompt(request) }] }],
            "generationConfig": {
                "temperature": 0.7,
                "topP": 0.9,
                "maxOutputTokens": 4096,
            },
        });

        debug!(model = %self.model, chars = request.excerpt.chars().count(), "requesting plan");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let generated: GenerateResponse = read_json(SERVICE, response).await?;

        let text = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| ServiceError::invalid_response("No response from Gemini API"))?;

        let plan = extract_plan(&text, request.image_count as usize)?;
        if plan.items.is_empty() {
            warn!(model = %self.model, "planner returned no items");
        }
        Ok(plan)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
