//! AI-generated hints for a tracked problem.
//!
//! The text-completion model sits behind [`HintGenerator`]. Whatever it
//! does (errors, empty output, prose instead of JSON, wrong array sizes),
//! [`HintService::suggest`] answers with usable [`Suggestions`]: the parsed
//! model output when it is well-formed, the fixed fallback otherwise.

use crate::types::{Difficulty, Status, Tracker};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const HINT_COUNT: usize = 3;
pub const APPROACH_COUNT: usize = 2;
pub const RESOURCE_COUNT: usize = 2;

/// Model parameters passed to the generator.
#[derive(Clone, Debug)]
pub struct HintConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            model_id: "amazon.nova-micro-v1:0".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// Hints, approaches and learning resources for one problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub hints: Vec<String>,
    pub approaches: Vec<String>,
    pub resources: Vec<String>,
}

impl Suggestions {
    /// Static payload used whenever generation fails.
    pub fn fallback() -> Self {
        Self {
            hints: vec![
                "Try breaking down the problem into smaller subproblems".to_string(),
                "Consider the time and space complexity constraints".to_string(),
                "Look for patterns in the examples provided".to_string(),
            ],
            approaches: vec![
                "Consider using a hashmap for O(1) lookups".to_string(),
                "Think about whether dynamic programming could help".to_string(),
            ],
            resources: vec![
                "https://leetcode.com/explore/".to_string(),
                "https://www.geeksforgeeks.org/".to_string(),
            ],
        }
    }

    fn check_shape(&self) -> Result<(), HintError> {
        let shape = (self.hints.len(), self.approaches.len(), self.resources.len());
        if shape != (HINT_COUNT, APPROACH_COUNT, RESOURCE_COUNT) {
            return Err(HintError::Malformed(format!(
                "expected {}/{}/{} entries, got {}/{}/{}",
                HINT_COUNT, APPROACH_COUNT, RESOURCE_COUNT, shape.0, shape.1, shape.2
            )));
        }
        let blank = self
            .hints
            .iter()
            .chain(&self.approaches)
            .chain(&self.resources)
            .any(|s| s.trim().is_empty());
        if blank {
            return Err(HintError::Malformed("blank entry".into()));
        }
        Ok(())
    }
}

/// The tracker fields a suggestion is based on.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintContext {
    pub problem: String,
    pub difficulty: Difficulty,
    pub status: Status,
    pub attempts: i64,
    pub time_spent: f64,
    pub notes: String,
}

impl From<&Tracker> for HintContext {
    fn from(tracker: &Tracker) -> Self {
        Self {
            problem: tracker.problem.clone(),
            difficulty: tracker.difficulty,
            status: tracker.status,
            attempts: tracker.attempts,
            time_spent: tracker.time_spent,
            notes: tracker.notes.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub model_id: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Error)]
pub enum HintError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Malformed suggestions: {0}")]
    Malformed(String),
}

/// Opaque text-completion backend.
pub trait HintGenerator: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, HintError>;
}

/// Generator for deployments without a model; always falls back.
pub struct NoopGenerator;

impl HintGenerator for NoopGenerator {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, HintError> {
        Err(HintError::Generation("no model configured".into()))
    }
}

pub struct HintService<G> {
    generator: G,
    config: HintConfig,
}

impl<G: HintGenerator> HintService<G> {
    pub fn new(generator: G, config: HintConfig) -> Self {
        Self { generator, config }
    }

    /// Suggestions for `context`. Never fails.
    pub fn suggest(&self, context: &HintContext) -> Suggestions {
        match self.try_suggest(context) {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!(problem = %context.problem, error = %e, "hint generation failed, using fallback");
                Suggestions::fallback()
            }
        }
    }

    fn try_suggest(&self, context: &HintContext) -> Result<Suggestions, HintError> {
        let request = CompletionRequest {
            model_id: self.config.model_id.clone(),
            prompt: build_prompt(context),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        };
        let text = self.generator.complete(&request)?;
        let suggestions = parse_suggestions(&text)?;
        debug!(problem = %context.problem, "parsed model suggestions");
        Ok(suggestions)
    }
}

pub fn build_prompt(context: &HintContext) -> String {
    let mut prompt = format!(
        "You are a helpful coding mentor. For the LeetCode problem \"{}\" (Difficulty: {}), \
         provide exactly {} specific hints, {} solution approaches, and {} learning resources \
         with real, working URLs.\n\n",
        context.problem, context.difficulty, HINT_COUNT, APPROACH_COUNT, RESOURCE_COUNT
    );
    prompt.push_str(&format!(
        "The learner's status is \"{}\" after {} attempt(s) and {} minute(s).\n",
        context.status, context.attempts, context.time_spent
    ));
    if !context.notes.trim().is_empty() {
        prompt.push_str(&format!("Their notes so far: {}\n", context.notes.trim()));
    }
    prompt.push_str(
        "\nRequirements:\n\
         - hints: progressive hints that don't give away the solution\n\
         - approaches: different algorithmic approaches with time complexity\n\
         - resources: real URLs to articles, videos, or documentation\n\n\
         Respond with ONLY valid JSON, no markdown, no extra text:\n\
         {\"hints\":[\"hint 1\",\"hint 2\",\"hint 3\"],\"approaches\":[\"approach 1\",\"approach 2\"],\
         \"resources\":[\"https://example-1\",\"https://example-2\"]}",
    );
    prompt
}

/// Parse model output, tolerating a surrounding markdown code fence.
pub fn parse_suggestions(text: &str) -> Result<Suggestions, HintError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(HintError::EmptyResponse);
    }

    let body = strip_code_fence(trimmed);
    let suggestions: Suggestions =
        serde_json::from_str(body).map_err(|e| HintError::Malformed(e.to_string()))?;
    suggestions.check_shape()?;
    Ok(suggestions)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => text,
    }
}
