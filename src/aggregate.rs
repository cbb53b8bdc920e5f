use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config::BenchmarkTrack;
use crate::error::EvalError;
use crate::jsonl::read_jsonl;
use crate::model::UNCATEGORIZED;

pub const UNKNOWN_MODEL: &str = "unknown_model";
pub const UNKNOWN_BENCHMARK: &str = "unknown_benchmark";
pub const UNKNOWN_DOCUMENT: &str = "unknown_document";

const RESULT_FILENAME_PATTERN: &str = r"(?i)benchmark_([ab])_(.+?)\.jsonl$";

/// What a result file's name says about its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTags {
    pub benchmark: Option<String>,
    pub model: String,
}

pub fn parse_result_filename(filename: &str, pattern: &Regex) -> FilenameTags {
    match pattern.captures(filename) {
        Some(captures) => FilenameTags {
            benchmark: captures
                .get(1)
                .and_then(|m| m.as_str().parse::<BenchmarkTrack>().ok())
                .map(|track| track.to_string()),
            model: captures
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
        },
        None => FilenameTags {
            benchmark: None,
            model: UNKNOWN_MODEL.to_string(),
        },
    }
}

pub fn result_filename_regex() -> Result<Regex> {
    Regex::new(RESULT_FILENAME_PATTERN).context("failed to compile result filename regex")
}

/// One result row reduced to what aggregation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub model: String,
    pub document: String,
    pub benchmark: String,
    pub category: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub model: String,
    pub document: String,
    pub benchmark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub categories: BTreeMap<String, f64>,
    pub functional_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub groups: BTreeMap<GroupKey, GroupSummary>,
    pub benchmark_means: BTreeMap<String, f64>,
    pub model_benchmark_means: BTreeMap<(String, String), f64>,
}

pub fn aggregate(paths: &[PathBuf]) -> Result<Aggregate> {
    Ok(aggregate_rows(&load_results(paths)?))
}

pub fn load_results(paths: &[PathBuf]) -> Result<Vec<ScoredRow>> {
    let pattern = result_filename_regex()?;
    let mut rows = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(EvalError::MissingInputFile(path.clone()).into());
        }

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let tags = parse_result_filename(filename, &pattern);

        let entries: Vec<Value> = read_jsonl(path)?;
        rows.extend(entries.iter().map(|entry| scored_row(entry, &tags)));
    }

    Ok(rows)
}

fn scored_row(entry: &Value, tags: &FilenameTags) -> ScoredRow {
    let metadata = |key: &str| {
        entry
            .pointer(&format!("/metadata/{key}"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
    };

    ScoredRow {
        model: metadata("extractor_model").unwrap_or_else(|| tags.model.clone()),
        document: metadata("document").unwrap_or_else(|| UNKNOWN_DOCUMENT.to_string()),
        benchmark: metadata("benchmark")
            .or_else(|| tags.benchmark.clone())
            .unwrap_or_else(|| UNKNOWN_BENCHMARK.to_string()),
        category: metadata("category").unwrap_or_else(|| UNCATEGORIZED.to_string()),
        score: row_score(entry),
    }
}

/// `question_score`, else `correctness_score`, else zero.
pub fn row_score(entry: &Value) -> f64 {
    ["/scores/question_score", "/scores/correctness_score"]
        .iter()
        .find_map(|pointer| entry.pointer(pointer).and_then(numeric))
        .unwrap_or(0.0)
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn aggregate_rows(rows: &[ScoredRow]) -> Aggregate {
    let mut grouped = BTreeMap::<GroupKey, BTreeMap<String, Vec<f64>>>::new();
    for row in rows {
        let key = GroupKey {
            model: row.model.clone(),
            document: row.document.clone(),
            benchmark: row.benchmark.clone(),
        };
        grouped
            .entry(key)
            .or_default()
            .entry(row.category.clone())
            .or_default()
            .push(row.score);
    }

    let mut aggregate = Aggregate::default();
    let mut benchmark_totals = BTreeMap::<String, Vec<f64>>::new();
    let mut model_benchmark_totals = BTreeMap::<(String, String), Vec<f64>>::new();

    for (key, category_map) in grouped {
        let mut categories = BTreeMap::new();
        let mut all_scores = Vec::new();
        for (category, values) in category_map {
            if let Some(category_mean) = mean(&values) {
                categories.insert(category, category_mean);
                all_scores.extend(values);
            }
        }

        let functional_score = mean(&all_scores).unwrap_or(0.0);
        benchmark_totals
            .entry(key.benchmark.clone())
            .or_default()
            .push(functional_score);
        model_benchmark_totals
            .entry((key.model.clone(), key.benchmark.clone()))
            .or_default()
            .push(functional_score);

        aggregate.groups.insert(
            key,
            GroupSummary {
                categories,
                functional_score,
            },
        );
    }

    aggregate.benchmark_means = benchmark_totals
        .into_iter()
        .map(|(benchmark, scores)| (benchmark, mean(&scores).unwrap_or(0.0)))
        .collect();
    aggregate.model_benchmark_means = model_benchmark_totals
        .into_iter()
        .map(|(key, scores)| (key, mean(&scores).unwrap_or(0.0)))
        .collect();

    aggregate
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Debug, Serialize)]
pub struct AggregateReport {
    pub groups: Vec<GroupReport>,
    pub benchmarks: BTreeMap<String, f64>,
    pub models: Vec<ModelBenchmarkReport>,
}

#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub model: String,
    pub document: String,
    pub benchmark: String,
    #[serde(flatten)]
    pub summary: GroupSummary,
}

#[derive(Debug, Serialize)]
pub struct ModelBenchmarkReport {
    pub model: String,
    pub benchmark: String,
    pub score: f64,
}

impl Aggregate {
    pub fn report(&self) -> AggregateReport {
        AggregateReport {
            groups: self
                .groups
                .iter()
                .map(|(key, summary)| GroupReport {
                    model: key.model.clone(),
                    document: key.document.clone(),
                    benchmark: key.benchmark.clone(),
                    summary: summary.clone(),
                })
                .collect(),
            benchmarks: self.benchmark_means.clone(),
            models: self
                .model_benchmark_means
                .iter()
                .map(|((model, benchmark), score)| ModelBenchmarkReport {
                    model: model.clone(),
                    benchmark: benchmark.clone(),
                    score: *score,
                })
                .collect(),
        }
    }

    /// `<model> - Benchmark <B>: <pct>%` lines, sorted by model then benchmark.
    pub fn percentage_lines(&self) -> Vec<String> {
        self.model_benchmark_means
            .iter()
            .map(|((model, benchmark), score)| {
                format!("{model} - Benchmark {benchmark}: {:.1}%", score * 100.0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use serde_json::json;

    fn row(model: &str, document: &str, benchmark: &str, category: &str, score: f64) -> ScoredRow {
        ScoredRow {
            model: model.to_string(),
            document: document.to_string(),
            benchmark: benchmark.to_string(),
            category: category.to_string(),
            score,
        }
    }

    fn key(model: &str, document: &str, benchmark: &str) -> GroupKey {
        GroupKey {
            model: model.to_string(),
            document: document.to_string(),
            benchmark: benchmark.to_string(),
        }
    }

    #[test]
    fn filename_pattern_extracts_track_and_model() {
        let pattern = result_filename_regex().expect("regex");

        let tags = parse_result_filename("reportX_benchmark_a_openai-gpt5.jsonl", &pattern);
        assert_eq!(tags.benchmark.as_deref(), Some("A"));
        assert_eq!(tags.model, "openai-gpt5");

        let upper = parse_result_filename("doc_BENCHMARK_B_anthropic_claude-4.5-opus.JSONL", &pattern);
        assert_eq!(upper.benchmark.as_deref(), Some("B"));
        assert_eq!(upper.model, "anthropic_claude-4.5-opus");

        let unmatched = parse_result_filename("answers_judged_xai_grok-4.1.jsonl", &pattern);
        assert_eq!(unmatched.benchmark, None);
        assert_eq!(unmatched.model, UNKNOWN_MODEL);
    }

    #[test]
    fn same_category_scores_average_into_category_and_group() {
        let aggregate = aggregate_rows(&[
            row("m", "doc", "A", "Tables", 1.0),
            row("m", "doc", "A", "Tables", 0.0),
        ]);

        let summary = &aggregate.groups[&key("m", "doc", "A")];
        assert_eq!(summary.categories["Tables"], 0.5);
        assert_eq!(summary.functional_score, 0.5);
    }

    #[test]
    fn group_score_is_flat_mean_not_mean_of_category_means() {
        let aggregate = aggregate_rows(&[
            row("m", "doc", "A", "Tables", 1.0),
            row("m", "doc", "A", "Tables", 1.0),
            row("m", "doc", "A", "Tables", 1.0),
            row("m", "doc", "A", "Charts", 0.0),
        ]);

        let summary = &aggregate.groups[&key("m", "doc", "A")];
        assert_eq!(summary.categories["Tables"], 1.0);
        assert_eq!(summary.categories["Charts"], 0.0);
        assert_eq!(summary.functional_score, 0.75);
    }

    #[test]
    fn benchmark_and_model_means_average_group_scores() {
        let aggregate = aggregate_rows(&[
            row("m1", "doc1", "A", "x", 1.0),
            row("m1", "doc2", "A", "x", 0.0),
            row("m1", "doc2", "A", "x", 0.0),
            row("m2", "doc1", "A", "x", 0.5),
            row("m2", "doc1", "B", "x", 0.25),
        ]);

        assert_eq!(aggregate.groups.len(), 4);
        assert_eq!(aggregate.model_benchmark_means[&("m1".to_string(), "A".to_string())], 0.5);
        assert_eq!(aggregate.model_benchmark_means[&("m2".to_string(), "A".to_string())], 0.5);
        assert_eq!(aggregate.model_benchmark_means[&("m2".to_string(), "B".to_string())], 0.25);
        assert_eq!(aggregate.benchmark_means["A"], 0.5);
        assert_eq!(aggregate.benchmark_means["B"], 0.25);
    }

    #[test]
    fn row_score_prefers_question_score_then_correctness() {
        assert_eq!(
            row_score(&json!({ "scores": { "question_score": 0.3, "correctness_score": 0.9 } })),
            0.3
        );
        assert_eq!(row_score(&json!({ "scores": { "correctness_score": 0.9 } })), 0.9);
        assert_eq!(row_score(&json!({ "scores": {} })), 0.0);
        assert_eq!(row_score(&json!({ "question": "no scores" })), 0.0);
    }

    #[test]
    fn load_results_prefers_metadata_and_falls_back_to_filename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("esg_benchmark_a_openai_gpt-5.1.jsonl");
        fs::write(
            &path,
            [
                json!({
                    "scores": { "question_score": 1.0 },
                    "metadata": {
                        "document": "esg",
                        "extractor_model": "openai/gpt-5.1",
                        "benchmark": "A",
                        "category": "Tables"
                    }
                }),
                json!({
                    "scores": { "correctness_score": 0.0 },
                    "metadata": { "document": "esg" }
                }),
            ]
            .iter()
            .map(|row| format!("{row}\n"))
            .collect::<String>(),
        )
        .expect("write fixture");

        let rows = load_results(&[path]).expect("load should succeed");
        assert_eq!(rows[0], row("openai/gpt-5.1", "esg", "A", "Tables", 1.0));
        assert_eq!(rows[1], row("openai_gpt-5.1", "esg", "A", UNCATEGORIZED, 0.0));
    }

    #[test]
    fn unmatched_filename_yields_sentinels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scratch.jsonl");
        fs::write(&path, "{\"scores\": {\"question_score\": 0.5}}\n").expect("write fixture");

        let rows = load_results(&[path]).expect("load should succeed");
        assert_eq!(
            rows[0],
            row(UNKNOWN_MODEL, UNKNOWN_DOCUMENT, UNKNOWN_BENCHMARK, UNCATEGORIZED, 0.5)
        );
    }

    #[test]
    fn missing_results_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = aggregate(&[dir.path().join("absent_benchmark_a_m.jsonl")])
            .expect_err("missing file should fail");
        assert!(matches!(
            error.downcast_ref::<EvalError>(),
            Some(EvalError::MissingInputFile(_))
        ));
    }

    #[test]
    fn percentage_lines_are_sorted_and_formatted() {
        let aggregate = aggregate_rows(&[
            row("zeta", "d", "A", "x", 1.0),
            row("alpha", "d", "B", "x", 0.123),
            row("alpha", "d", "A", "x", 0.5),
        ]);

        assert_eq!(
            aggregate.percentage_lines(),
            vec![
                "alpha - Benchmark A: 50.0%".to_string(),
                "alpha - Benchmark B: 12.3%".to_string(),
                "zeta - Benchmark A: 100.0%".to_string(),
            ]
        );
    }

    #[test]
    fn report_serializes_groups_with_flattened_summary() {
        let aggregate = aggregate_rows(&[row("m", "doc", "A", "Tables", 1.0)]);
        let value = serde_json::to_value(aggregate.report()).expect("serialize report");

        assert_eq!(value["groups"][0]["model"], "m");
        assert_eq!(value["groups"][0]["functional_score"], 1.0);
        assert_eq!(value["groups"][0]["categories"]["Tables"], 1.0);
        assert_eq!(value["benchmarks"]["A"], 1.0);
        assert_eq!(value["models"][0]["score"], 1.0);
    }
}
