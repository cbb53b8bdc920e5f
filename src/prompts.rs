use std::fs;
use std::path::Path;

use crate::config::BenchmarkTrack;
use crate::error::EvalError;

pub const JUDGE_SYSTEM_PROMPT: &str = "You are an evaluation judge.";

pub const EXTRACTOR_SYSTEM_PROMPT: &str = "You are a high-accuracy PDF extraction agent.
A PDF (or PDF slice) is attached. Use ONLY its contents.
Follow the user's question exactly, whether it asks for structured lists or semantic boundaries.

IMPORTANT NAVIGATION RULES:
- When the user says \"On page X\", they mean the printed number on the page (in headers/footers/corners). Ignore the PDF file index.
- Scan visually across headers, footers, and corners to locate the page with that printed number before answering.
- Do not assume a location (top vs. bottom); search the entire page.

Output VALID JSON ONLY in this format:
{
  \"answer\": <value copied or derived from the PDF>,
  \"rationale\": \"<brief explanation pointing to the relevant PDF content>\"
}

Notes:
- \"answer\" may be a string, number, list, or object depending on the question.
- Always include a rationale (even if brief) grounded in what you saw.
- Do NOT add markdown, commentary, or page numbers unless they visibly appear.";

/// Values substituted into a judge template.
#[derive(Debug, Clone, Copy)]
pub struct PromptFields<'a> {
    pub question: &'a str,
    pub ground_truth_answer: &'a str,
    pub ground_truth_rationale: &'a str,
    pub model_answer: &'a str,
    pub model_rationale: &'a str,
}

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    track_a: String,
    track_b: String,
}

impl PromptTemplates {
    pub fn new(track_a: impl Into<String>, track_b: impl Into<String>) -> Self {
        Self {
            track_a: track_a.into(),
            track_b: track_b.into(),
        }
    }

    pub fn load(prompts_dir: &Path) -> Result<Self, EvalError> {
        Ok(Self::new(
            read_template(prompts_dir, BenchmarkTrack::A)?,
            read_template(prompts_dir, BenchmarkTrack::B)?,
        ))
    }

    pub fn template(&self, track: BenchmarkTrack) -> &str {
        match track {
            BenchmarkTrack::A => &self.track_a,
            BenchmarkTrack::B => &self.track_b,
        }
    }

    pub fn render(&self, track: BenchmarkTrack, fields: PromptFields<'_>) -> String {
        self.template(track)
            .replace("{{QUESTION}}", fields.question)
            .replace("{{GROUND_TRUTH_ANSWER}}", fields.ground_truth_answer)
            .replace("{{GROUND_TRUTH_RATIONALE}}", fields.ground_truth_rationale)
            .replace("{{MODEL_ANSWER}}", fields.model_answer)
            .replace("{{MODEL_RATIONALE}}", fields.model_rationale)
    }
}

fn read_template(prompts_dir: &Path, track: BenchmarkTrack) -> Result<String, EvalError> {
    let path = prompts_dir.join(track.prompt_file());
    fs::read_to_string(&path).map_err(|err| {
        EvalError::config(format!("prompt file not found: {} ({err})", path.display()))
    })
}
