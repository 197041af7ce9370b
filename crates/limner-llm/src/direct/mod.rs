//! Direct service clients: Gemini for planning, kie.ai for images

pub mod gemini;
pub mod kie;

// Re-export clients
pub use gemini::{build_plan_prompt, extract_plan, GeminiPlanner};
pub use kie::{KieClient, KIE_MODEL};
