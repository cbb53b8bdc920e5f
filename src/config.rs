use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::EvalError;
use crate::util::file_safe_model_name;

pub const DEFAULT_EXTRACTOR_MODELS: &[&str] = &[
    "anthropic/claude-4.5-opus",
    "openai/gpt-5.1",
    "google/gemini-3-pro-preview",
];

pub const DEFAULT_JUDGE_MODELS: &[&str] = &["deepseek/deepseek-v3.2", "xai/grok-4.1"];

pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// The two question sets. Track A asks visual/layout questions, track B
/// semantic ones; each has its own prompt and file naming.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, ValueEnum)]
pub enum BenchmarkTrack {
    A,
    B,
}

impl BenchmarkTrack {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::A => "benchmark_a",
            Self::B => "benchmark_b",
        }
    }

    fn file_stem_suffix(self) -> &'static str {
        match self {
            Self::A => "benchmark_a_vision",
            Self::B => "benchmark_b_semantic",
        }
    }

    pub fn questions_file(self, document: &str) -> String {
        format!("{document}_{}_questions.jsonl", self.file_stem_suffix())
    }

    pub fn ground_truth_file(self, document: &str) -> String {
        format!("{document}_{}.jsonl", self.file_stem_suffix())
    }

    pub fn prompt_file(self) -> &'static str {
        match self {
            Self::A => "benchmark_a_correctness_prompt.txt",
            Self::B => "benchmark_b_correctness_prompt.txt",
        }
    }
}

impl fmt::Display for BenchmarkTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenchmarkTrack {
    type Err = EvalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(EvalError::config(format!(
                "unknown benchmark type '{other}', expected one of [A, B]"
            ))),
        }
    }
}

/// Model identifiers a run may use. Built once at startup and checked before
/// any provider is constructed.
#[derive(Debug, Clone)]
pub struct ModelAllowList {
    extractors: BTreeSet<String>,
    judges: BTreeSet<String>,
}

impl Default for ModelAllowList {
    fn default() -> Self {
        Self::from_overrides(&[], &[])
    }
}

impl ModelAllowList {
    /// Empty override lists fall back to the built-in defaults.
    pub fn from_overrides(extractors: &[String], judges: &[String]) -> Self {
        fn collect(overrides: &[String], defaults: &[&str]) -> BTreeSet<String> {
            if overrides.is_empty() {
                defaults.iter().map(|model| (*model).to_string()).collect()
            } else {
                overrides.iter().map(|model| model.trim().to_string()).collect()
            }
        }

        Self {
            extractors: collect(extractors, DEFAULT_EXTRACTOR_MODELS),
            judges: collect(judges, DEFAULT_JUDGE_MODELS),
        }
    }

    pub fn check_extractor(&self, model: &str) -> Result<(), EvalError> {
        check(&self.extractors, "extractor", model)
    }

    pub fn check_judge(&self, model: &str) -> Result<(), EvalError> {
        check(&self.judges, "judge", model)
    }
}

fn check(allowed: &BTreeSet<String>, role: &str, model: &str) -> Result<(), EvalError> {
    if allowed.contains(model) {
        return Ok(());
    }
    let allowed = allowed.iter().cloned().collect::<Vec<_>>().join(", ");
    Err(EvalError::config(format!(
        "{role} model '{model}' is not allowed; allowed = [{allowed}]"
    )))
}

pub fn require_env(name: &str) -> Result<String, EvalError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(EvalError::config(format!("missing {name} in environment"))),
    }
}

/// On-disk layout of inputs and outputs.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    pub prompts_dir: PathBuf,
}

impl DataLayout {
    pub fn questions_path(&self, document: &str, track: BenchmarkTrack) -> PathBuf {
        self.data_dir
            .join("questions")
            .join(track.questions_file(document))
    }

    pub fn ground_truth_path(&self, document: &str, track: BenchmarkTrack) -> PathBuf {
        self.data_dir
            .join("ground_truth")
            .join(track.ground_truth_file(document))
    }

    pub fn pdf_path(&self, document: &str) -> PathBuf {
        self.data_dir
            .join("documents")
            .join(format!("{document}.pdf"))
    }

    pub fn evaluation_output_path(
        &self,
        document: &str,
        track: BenchmarkTrack,
        extractor_model: &str,
    ) -> PathBuf {
        self.results_dir.join(format!(
            "{document}_{}_{}.jsonl",
            track.label(),
            file_safe_model_name(extractor_model)
        ))
    }

    pub fn judged_output_path(&self, answers_path: &Path, judge_model: &str) -> PathBuf {
        let answers_tag = answers_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("answers");
        self.results_dir.join(format!(
            "{answers_tag}_judged_{}.jsonl",
            file_safe_model_name(judge_model)
        ))
    }
}

pub fn manifest_path_for(results_path: &Path) -> PathBuf {
    results_path.with_extension("manifest.json")
}
