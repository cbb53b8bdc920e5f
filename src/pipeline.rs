use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::BenchmarkTrack;
use crate::error::EvalError;
use crate::model::{
    GroundTruthEntry, ModelAnswer, PrecomputedAnswer, Question, ResultRow, RowMetadata,
    ScoreRecord, UNCATEGORIZED,
};
use crate::providers::Extractor;
use crate::scoring::Scorer;
use crate::util::now_utc_string;

/// Keys owned by the harness; anything else in a carried-over metadata
/// object is preserved verbatim.
const RESERVED_METADATA_KEYS: &[&str] = &[
    "document",
    "extractor_model",
    "judge_model",
    "benchmark",
    "category",
    "source_answers_file",
    "error",
    "timestamp",
];

#[derive(Debug, Default)]
pub struct EvaluationOutcome {
    pub rows: Vec<ResultRow>,
    pub failures: usize,
}

impl EvaluationOutcome {
    fn record_success(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    fn record_failure(&mut self, row: ResultRow) {
        self.failures += 1;
        self.rows.push(row);
    }
}

/// Ground truth keyed by trimmed question text.
pub fn index_ground_truth(entries: Vec<GroundTruthEntry>) -> HashMap<String, GroundTruthEntry> {
    entries
        .into_iter()
        .map(|entry| (entry.question.trim().to_string(), entry))
        .collect()
}

fn lookup<'a>(
    ground_truth: &'a HashMap<String, GroundTruthEntry>,
    question: &str,
) -> Result<&'a GroundTruthEntry, EvalError> {
    ground_truth
        .get(question)
        .ok_or_else(|| EvalError::MissingGroundTruth(question.to_string()))
}

pub struct DocumentRun<'a> {
    pub document: &'a str,
    pub track: BenchmarkTrack,
    pub pdf_path: &'a Path,
}

/// Asks the extractor every question, scores each answer, and keeps going
/// past individual failures.
pub fn evaluate_questions(
    run: &DocumentRun<'_>,
    questions: &[Question],
    ground_truth: &HashMap<String, GroundTruthEntry>,
    extractor: &dyn Extractor,
    scorer: &Scorer,
) -> EvaluationOutcome {
    let mut outcome = EvaluationOutcome::default();
    let total = questions.len();

    for (index, question) in questions.iter().enumerate() {
        let text = question.text();
        let category = question.category();
        info!(index = index + 1, total, question = %text, "evaluating question");

        let metadata = RowMetadata {
            document: run.document.to_string(),
            extractor_model: Some(extractor.model_id().to_string()),
            judge_model: scorer.judge_model().to_string(),
            benchmark: run.track.to_string(),
            category: category.to_string(),
            timestamp: String::new(),
            ..RowMetadata::default()
        };

        let attempt = lookup(ground_truth, text).and_then(|entry| {
            let answer = extractor.extract(text, run.pdf_path)?;
            let scores = scorer.score(&answer, entry, run.track)?;
            Ok((answer, scores))
        });

        match attempt {
            Ok((answer, scores)) => outcome.record_success(ResultRow {
                question: text.to_string(),
                model_answer: Some(answer),
                scores,
                metadata: stamped(metadata),
            }),
            Err(err) => {
                warn!(index = index + 1, question = %text, error = %err, "question failed");
                outcome.record_failure(failure_row(text, None, metadata, &err));
            }
        }
    }

    outcome
}

pub struct PrecomputedRun<'a> {
    pub document: &'a str,
    pub track: BenchmarkTrack,
    pub answers_path: &'a Path,
}

/// Scores answers that were produced elsewhere; no extractor is called.
pub fn judge_precomputed(
    run: &PrecomputedRun<'_>,
    entries: &[PrecomputedAnswer],
    ground_truth: &HashMap<String, GroundTruthEntry>,
    scorer: &Scorer,
) -> EvaluationOutcome {
    let mut outcome = EvaluationOutcome::default();
    let total = entries.len();
    let answers_file = run.answers_path.display().to_string();

    for (index, entry) in entries.iter().enumerate() {
        let text = entry.question_text();
        info!(index = index + 1, total, question = %text, "judging precomputed answer");

        let mut metadata = carried_metadata(entry.metadata.as_ref());
        metadata.document = run.document.to_string();
        metadata.judge_model = scorer.judge_model().to_string();
        metadata.source_answers_file = Some(answers_file.clone());
        metadata.benchmark = run.track.to_string();

        let gt_entry = if text.is_empty() {
            Err(EvalError::InvalidRecord(
                "missing question text in answers file".to_string(),
            ))
        } else {
            lookup(ground_truth, &text)
        };

        let attempt = gt_entry.and_then(|gt| {
            let answer = entry.resolved_answer();
            let scores = scorer.score(&answer, gt, run.track)?;
            Ok((gt, answer, scores))
        });

        match attempt {
            Ok((gt, answer, scores)) => {
                metadata.category = gt.category().to_string();
                outcome.record_success(ResultRow {
                    question: text,
                    model_answer: Some(answer),
                    scores,
                    metadata: stamped(metadata),
                });
            }
            Err(err) => {
                warn!(index = index + 1, question = %text, error = %err, "judging failed");
                metadata.category = ground_truth
                    .get(&text)
                    .map(|gt| gt.category().to_string())
                    .or_else(|| entry.metadata_category())
                    .unwrap_or_else(|| UNCATEGORIZED.to_string());
                let answer = entry.model_answer.clone().map(ModelAnswer::from_loose_value);
                outcome.record_failure(failure_row(&text, answer, metadata, &err));
            }
        }
    }

    outcome
}

fn stamped(mut metadata: RowMetadata) -> RowMetadata {
    metadata.timestamp = now_utc_string();
    metadata
}

fn failure_row(
    question: &str,
    model_answer: Option<ModelAnswer>,
    mut metadata: RowMetadata,
    err: &EvalError,
) -> ResultRow {
    let message = err.to_string();
    metadata.error = Some(message.clone());
    ResultRow {
        question: question.to_string(),
        model_answer,
        scores: ScoreRecord::failure(&message),
        metadata: stamped(metadata),
    }
}

fn carried_metadata(source: Option<&Map<String, Value>>) -> RowMetadata {
    let Some(source) = source else {
        return RowMetadata::default();
    };

    let extra = source
        .iter()
        .filter(|(key, _)| !RESERVED_METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    RowMetadata {
        extractor_model: source
            .get("extractor_model")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        extra,
        ..RowMetadata::default()
    }
}
