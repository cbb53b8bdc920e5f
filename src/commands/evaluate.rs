use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use super::{RunInfo, persist_outcome};
use crate::cli::EvaluateArgs;
use crate::config::{BenchmarkTrack, DataLayout};
use crate::error::EvalError;
use crate::jsonl::read_jsonl;
use crate::model::{GroundTruthEntry, Question};
use crate::pipeline::{DocumentRun, EvaluationOutcome, evaluate_questions, index_ground_truth};
use crate::prompts::PromptTemplates;
use crate::providers::{Extractor, build_extractor, build_judge};
use crate::scoring::Scorer;

/// Everything one document run reads before the first model call.
struct DocumentInputs {
    pdf_path: PathBuf,
    questions: Vec<Question>,
    ground_truth: HashMap<String, GroundTruthEntry>,
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let layout = args.layout.layout();
    let allow_list = args.providers.allow_list();
    let http = args.providers.http();

    let extractor = build_extractor(&args.extractor, &allow_list, http)?;
    let judge = build_judge(&args.judge, &allow_list, http)?;
    let templates = PromptTemplates::load(&layout.prompts_dir)?;
    let scorer = Scorer::new(judge, templates);

    evaluate_document(&layout, &args.doc, args.benchmark, extractor.as_ref(), &scorer)?;
    Ok(())
}

fn load_inputs(
    layout: &DataLayout,
    document: &str,
    track: BenchmarkTrack,
) -> Result<DocumentInputs> {
    let pdf_path = layout.pdf_path(document);
    if !pdf_path.exists() {
        return Err(EvalError::MissingInputFile(pdf_path).into());
    }
    let questions_path = layout.questions_path(document, track);
    let questions: Vec<Question> = read_jsonl(&questions_path)
        .with_context(|| format!("failed to load questions for {document}"))?;
    let ground_truth_path = layout.ground_truth_path(document, track);
    let ground_truth: Vec<GroundTruthEntry> = read_jsonl(&ground_truth_path)
        .with_context(|| format!("failed to load ground truth for {document}"))?;

    Ok(DocumentInputs {
        pdf_path,
        questions,
        ground_truth: index_ground_truth(ground_truth),
    })
}

/// Loads the document's inputs, runs every question, and saves the rows.
/// Nothing is written when an input is missing.
fn evaluate_document(
    layout: &DataLayout,
    document: &str,
    track: BenchmarkTrack,
    extractor: &dyn Extractor,
    scorer: &Scorer,
) -> Result<EvaluationOutcome> {
    let started = Utc::now();
    let results_path = layout.evaluation_output_path(document, track, extractor.model_id());

    info!(
        document,
        extractor = extractor.model_id(),
        judge = scorer.judge_model(),
        benchmark = %track,
        output = %results_path.display(),
        "starting evaluation"
    );

    let inputs = load_inputs(layout, document, track)?;
    let document_run = DocumentRun {
        document,
        track,
        pdf_path: &inputs.pdf_path,
    };
    let outcome = evaluate_questions(
        &document_run,
        &inputs.questions,
        &inputs.ground_truth,
        extractor,
        scorer,
    );

    persist_outcome(
        RunInfo {
            mode: "evaluate",
            started,
            document,
            track,
            extractor_model: Some(extractor.model_id()),
            judge_model: scorer.judge_model(),
            source_path: &inputs.pdf_path,
        },
        &outcome,
        &results_path,
    )?;

    if outcome.failures > 0 {
        warn!(failures = outcome.failures, "evaluation finished with failures");
    }
    info!(
        questions = inputs.questions.len(),
        failures = outcome.failures,
        "evaluation complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::commands::test_support::{
        EchoExtractor, FixedJudge, has_missing_input, layout_in, scorer, write_lines,
    };

    const DOC: &str = "esg_2025";

    fn seed_document(layout: &DataLayout, pdf: bool, questions: bool, ground_truth: bool) {
        if pdf {
            let path = layout.pdf_path(DOC);
            fs::create_dir_all(path.parent().expect("pdf parent")).expect("documents dir");
            fs::write(&path, b"%PDF-1.7").expect("write pdf");
        }
        if questions {
            write_lines(
                &layout.questions_path(DOC, BenchmarkTrack::A),
                &[r#"{"question": "What year?", "category": "Targets"}"#],
            );
        }
        if ground_truth {
            write_lines(
                &layout.ground_truth_path(DOC, BenchmarkTrack::A),
                &[r#"{"question": "What year?", "ground_truth_answer": "2030", "rationale": "intro"}"#],
            );
        }
    }

    fn results_path(layout: &DataLayout) -> PathBuf {
        layout.evaluation_output_path(DOC, BenchmarkTrack::A, "openai/gpt-5.1")
    }

    fn assert_nothing_written(layout: &DataLayout) {
        assert!(!results_path(layout).exists());
        assert!(!layout.results_dir.exists());
    }

    #[test]
    fn missing_pdf_aborts_before_writing_results() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_in(dir.path());
        seed_document(&layout, false, true, true);

        let error = evaluate_document(
            &layout,
            DOC,
            BenchmarkTrack::A,
            &EchoExtractor,
            &scorer(FixedJudge::correct()),
        )
        .expect_err("pdf is missing");

        assert!(has_missing_input(&error, &layout.pdf_path(DOC)));
        assert_nothing_written(&layout);
    }

    #[test]
    fn missing_questions_file_aborts_before_writing_results() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_in(dir.path());
        seed_document(&layout, true, false, true);

        let error = evaluate_document(
            &layout,
            DOC,
            BenchmarkTrack::A,
            &EchoExtractor,
            &scorer(FixedJudge::correct()),
        )
        .expect_err("questions are missing");

        assert!(has_missing_input(
            &error,
            &layout.questions_path(DOC, BenchmarkTrack::A)
        ));
        assert_nothing_written(&layout);
    }

    #[test]
    fn missing_ground_truth_file_aborts_before_writing_results() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_in(dir.path());
        seed_document(&layout, true, true, false);

        let error = evaluate_document(
            &layout,
            DOC,
            BenchmarkTrack::A,
            &EchoExtractor,
            &scorer(FixedJudge::correct()),
        )
        .expect_err("ground truth is missing");

        assert!(has_missing_input(
            &error,
            &layout.ground_truth_path(DOC, BenchmarkTrack::A)
        ));
        assert_nothing_written(&layout);
    }

    #[test]
    fn complete_inputs_write_rows_and_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_in(dir.path());
        seed_document(&layout, true, true, true);

        let outcome = evaluate_document(
            &layout,
            DOC,
            BenchmarkTrack::A,
            &EchoExtractor,
            &scorer(FixedJudge::correct()),
        )
        .expect("evaluation should succeed");

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.failures, 0);
        let raw = fs::read_to_string(results_path(&layout)).expect("results written");
        assert_eq!(raw.lines().count(), 1);
        assert!(crate::config::manifest_path_for(&results_path(&layout)).exists());
    }
}
