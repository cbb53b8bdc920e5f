use serde::Deserialize;
use serde_json::Value;

use crate::config::BenchmarkTrack;
use crate::error::EvalError;
use crate::model::{GroundTruthEntry, ModelAnswer, ScoreRecord, display_value};
use crate::parse::parse_model_json;
use crate::prompts::{JUDGE_SYSTEM_PROMPT, PromptFields, PromptTemplates};
use crate::providers::Judge;

/// Whatever subset of fields a judge chose to return.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JudgeVerdict {
    pub is_correct: Option<Value>,
    pub has_value: Option<Value>,
    pub error_type: Option<Value>,
    pub question_score: Option<Value>,
    pub judge_reasoning: Option<Value>,
    pub justification: Option<Value>,
}

pub struct Scorer {
    judge: Box<dyn Judge>,
    templates: PromptTemplates,
}

impl Scorer {
    pub fn new(judge: Box<dyn Judge>, templates: PromptTemplates) -> Self {
        Self { judge, templates }
    }

    pub fn judge_model(&self) -> &str {
        self.judge.model_id()
    }

    pub fn score(
        &self,
        model_answer: &ModelAnswer,
        ground_truth: &GroundTruthEntry,
        track: BenchmarkTrack,
    ) -> Result<ScoreRecord, EvalError> {
        let ground_truth_answer = display_value(ground_truth.reference_answer());
        let ground_truth_rationale = display_value(ground_truth.reference_rationale());
        let answer = display_value(model_answer.answer.clone());

        let prompt = self.templates.render(
            track,
            PromptFields {
                question: &ground_truth.question,
                ground_truth_answer: &ground_truth_answer,
                ground_truth_rationale: &ground_truth_rationale,
                model_answer: &answer,
                model_rationale: &model_answer.rationale,
            },
        );

        let raw = self.judge.complete(JUDGE_SYSTEM_PROMPT, &prompt)?;
        let verdict = parse_verdict(&raw)?;
        Ok(normalize_verdict(&verdict))
    }
}

pub fn parse_verdict(raw: &str) -> Result<JudgeVerdict, EvalError> {
    let value = parse_model_json(raw)?;
    if !value.is_object() {
        return Err(EvalError::malformed(raw.trim()));
    }
    serde_json::from_value(value).map_err(|_| EvalError::malformed(raw.trim()))
}

pub fn normalize_verdict(verdict: &JudgeVerdict) -> ScoreRecord {
    let is_correct = verdict.is_correct.as_ref().is_some_and(truthy);
    let has_value = verdict.has_value.as_ref().is_some_and(truthy);
    let pass_fail = if is_correct { 1.0 } else { 0.0 };

    let question_score = verdict
        .question_score
        .as_ref()
        .and_then(coerce_f64)
        .unwrap_or(pass_fail);

    let justification = present_text(&verdict.judge_reasoning)
        .or_else(|| present_text(&verdict.justification))
        .unwrap_or_default();

    let error_type = verdict
        .error_type
        .as_ref()
        .filter(|value| truthy(value))
        .map(|value| display_value(value.clone()));
    let rationale_justification = error_type
        .clone()
        .unwrap_or_else(|| justification.clone());

    ScoreRecord {
        correctness_score: question_score,
        correctness_justification: justification.clone(),
        rationale_score: pass_fail,
        rationale_justification,
        is_correct,
        has_value,
        error_type,
        judge_reasoning: justification,
        question_score,
    }
}

/// Null, false, zero, and empty strings/containers are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn present_text(value: &Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(other) => Some(display_value(other.clone())),
    }
}
