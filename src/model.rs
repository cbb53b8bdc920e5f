use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EvalError;

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl Question {
    pub fn text(&self) -> &str {
        self.question.trim()
    }

    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

/// Reference answer for one question. Older files name the answer field
/// `answer`, newer ones `ground_truth_answer`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundTruthEntry {
    pub question: String,
    #[serde(default)]
    pub ground_truth_answer: Option<Value>,
    #[serde(default)]
    pub answer: Option<Value>,
    #[serde(default)]
    pub rationale: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
}

impl GroundTruthEntry {
    pub fn reference_answer(&self) -> Value {
        self.ground_truth_answer
            .clone()
            .or_else(|| self.answer.clone())
            .unwrap_or_else(|| Value::String(String::new()))
    }

    pub fn reference_rationale(&self) -> Value {
        self.rationale
            .clone()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAnswer {
    pub answer: Value,
    pub rationale: String,
}

impl ModelAnswer {
    /// Strict form used for extractor replies: both keys must be present.
    pub fn from_extractor_value(value: Value) -> Result<Self, EvalError> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(EvalError::malformed(format!(
                    "extractor response must be a JSON object, got: {other}"
                )));
            }
        };

        if !object.contains_key("answer") || !object.contains_key("rationale") {
            return Err(EvalError::malformed(format!(
                "extractor JSON missing required keys: {}",
                Value::Object(object)
            )));
        }

        let answer = object.remove("answer").unwrap_or(Value::Null);
        let rationale = object
            .remove("rationale")
            .map(display_value)
            .unwrap_or_default();
        Ok(Self { answer, rationale })
    }

    /// Lenient form used for precomputed answers: missing fields become "".
    pub fn from_loose_parts(answer: Option<Value>, rationale: Option<Value>) -> Self {
        Self {
            answer: answer.unwrap_or_else(|| Value::String(String::new())),
            rationale: rationale.map(display_value).unwrap_or_default(),
        }
    }

    pub fn from_loose_value(value: Value) -> Self {
        match value {
            Value::Object(mut object) => {
                Self::from_loose_parts(object.remove("answer"), object.remove("rationale"))
            }
            other => Self::from_loose_parts(Some(other), None),
        }
    }
}

/// Strings render without quotes; everything else renders as compact JSON.
pub fn display_value(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub correctness_score: f64,
    pub correctness_justification: String,
    pub rationale_score: f64,
    pub rationale_justification: String,
    pub is_correct: bool,
    pub has_value: bool,
    pub error_type: Option<String>,
    pub judge_reasoning: String,
    pub question_score: f64,
}

impl ScoreRecord {
    pub fn failure(message: &str) -> Self {
        let justification = format!("Error: {message}");
        Self {
            correctness_score: 0.0,
            correctness_justification: justification.clone(),
            rationale_score: 0.0,
            rationale_justification: justification.clone(),
            is_correct: false,
            has_value: false,
            error_type: None,
            judge_reasoning: justification,
            question_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowMetadata {
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor_model: Option<String>,
    pub judge_model: String,
    pub benchmark: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_answers_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub question: String,
    pub model_answer: Option<ModelAnswer>,
    pub scores: ScoreRecord,
    pub metadata: RowMetadata,
}

/// One line of a precomputed answers file. Either `model_answer` holds the
/// nested `{answer, rationale}` object or the two fields sit at top level.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrecomputedAnswer {
    pub question: Option<Value>,
    pub model_answer: Option<Value>,
    pub answer: Option<Value>,
    pub rationale: Option<Value>,
    pub metadata: Option<Map<String, Value>>,
}

impl PrecomputedAnswer {
    pub fn question_text(&self) -> String {
        self.question
            .clone()
            .map(display_value)
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    pub fn resolved_answer(&self) -> ModelAnswer {
        match &self.model_answer {
            Some(nested) => ModelAnswer::from_loose_value(nested.clone()),
            None => ModelAnswer::from_loose_parts(self.answer.clone(), self.rationale.clone()),
        }
    }

    pub fn metadata_category(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("category"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub mode: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub document: String,
    pub benchmark: String,
    pub extractor_model: Option<String>,
    pub judge_model: String,
    pub source_path: String,
    pub source_sha256: String,
    pub question_count: usize,
    pub failure_count: usize,
    pub results_path: String,
}
