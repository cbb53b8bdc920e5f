pub mod aggregate;
pub mod evaluate;
pub mod judge;

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::config::{BenchmarkTrack, manifest_path_for};
use crate::jsonl::write_jsonl;
use crate::model::RunManifest;
use crate::pipeline::EvaluationOutcome;
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

/// Identity of one evaluate/judge pass, recorded in its run manifest.
struct RunInfo<'a> {
    mode: &'static str,
    started: DateTime<Utc>,
    document: &'a str,
    track: BenchmarkTrack,
    extractor_model: Option<&'a str>,
    judge_model: &'a str,
    source_path: &'a Path,
}

/// Writes the rows (failed ones included) and a manifest beside them.
fn persist_outcome(
    run: RunInfo<'_>,
    outcome: &EvaluationOutcome,
    results_path: &Path,
) -> Result<()> {
    write_jsonl(results_path, &outcome.rows)?;

    let manifest = RunManifest {
        manifest_version: 1,
        run_id: format!("run-{}", utc_compact_string(run.started)),
        mode: run.mode.to_string(),
        status: if outcome.failures == 0 {
            "completed".to_string()
        } else {
            "completed_with_failures".to_string()
        },
        started_at: run.started.to_rfc3339_opts(SecondsFormat::Secs, true),
        updated_at: now_utc_string(),
        document: run.document.to_string(),
        benchmark: run.track.to_string(),
        extractor_model: run.extractor_model.map(ToOwned::to_owned),
        judge_model: run.judge_model.to_string(),
        source_path: run.source_path.display().to_string(),
        source_sha256: sha256_file(run.source_path)?,
        question_count: outcome.rows.len(),
        failure_count: outcome.failures,
        results_path: results_path.display().to_string(),
    };

    let manifest_path = manifest_path_for(results_path);
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %results_path.display(), rows = outcome.rows.len(), "saved results");
    info!(path = %manifest_path.display(), "wrote run manifest");
    Ok(())
}


#[cfg(test)]
mod test_support {
    use std::fs;
    use std::path::Path;

    use serde_json::Value;

    use crate::config::DataLayout;
    use crate::error::EvalError;
    use crate::model::ModelAnswer;
    use crate::prompts::PromptTemplates;
    use crate::providers::{Extractor, Judge};
    use crate::scoring::Scorer;

    /// Answers every question with the question text.
    pub struct EchoExtractor;

    impl Extractor for EchoExtractor {
        fn model_id(&self) -> &str {
            "openai/gpt-5.1"
        }

        fn extract(&self, question: &str, _pdf_path: &Path) -> Result<ModelAnswer, EvalError> {
            Ok(ModelAnswer {
                answer: Value::String(question.to_string()),
                rationale: "page 1".to_string(),
            })
        }
    }

    pub struct FixedJudge {
        reply: &'static str,
    }

    impl FixedJudge {
        pub fn correct() -> Self {
            Self {
                reply: r#"{"is_correct": true, "judge_reasoning": "matches"}"#,
            }
        }
    }

    impl Judge for FixedJudge {
        fn model_id(&self) -> &str {
            "deepseek/deepseek-v3.2"
        }

        fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, EvalError> {
            Ok(self.reply.to_string())
        }
    }

    pub fn scorer(judge: FixedJudge) -> Scorer {
        Scorer::new(
            Box::new(judge),
            PromptTemplates::new("A {{QUESTION}}", "B {{QUESTION}}"),
        )
    }

    pub fn layout_in(root: &Path) -> DataLayout {
        DataLayout {
            data_dir: root.join("data"),
            results_dir: root.join("results"),
            prompts_dir: root.join("prompts"),
        }
    }

    pub fn write_lines(path: &Path, lines: &[&str]) {
        fs::create_dir_all(path.parent().expect("parent dir")).expect("create parent");
        let mut body = lines.join("\n");
        body.push('\n');
        fs::write(path, body).expect("write lines");
    }

    pub fn has_missing_input(error: &anyhow::Error, expected: &Path) -> bool {
        error.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<EvalError>(),
                Some(EvalError::MissingInputFile(path)) if path == expected
            )
        })
    }
}
