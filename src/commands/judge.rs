use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use super::{RunInfo, persist_outcome};
use crate::cli::JudgeArgs;
use crate::config::{BenchmarkTrack, DataLayout};
use crate::jsonl::read_jsonl;
use crate::model::{GroundTruthEntry, PrecomputedAnswer};
use crate::pipeline::{EvaluationOutcome, PrecomputedRun, index_ground_truth, judge_precomputed};
use crate::prompts::PromptTemplates;
use crate::providers::build_judge;
use crate::scoring::Scorer;

pub fn run(args: JudgeArgs) -> Result<()> {
    let layout = args.layout.layout();
    let allow_list = args.providers.allow_list();

    let judge = build_judge(&args.judge, &allow_list, args.providers.http())?;
    let templates = PromptTemplates::load(&layout.prompts_dir)?;
    let scorer = Scorer::new(judge, templates);

    judge_answers_file(&layout, &args.doc, args.benchmark, &args.answers, &scorer)?;
    Ok(())
}

fn load_inputs(
    layout: &DataLayout,
    document: &str,
    track: BenchmarkTrack,
    answers_path: &Path,
) -> Result<(Vec<PrecomputedAnswer>, HashMap<String, GroundTruthEntry>)> {
    let entries: Vec<PrecomputedAnswer> = read_jsonl(answers_path)
        .with_context(|| format!("failed to load answers from {}", answers_path.display()))?;
    let ground_truth_path = layout.ground_truth_path(document, track);
    let ground_truth: Vec<GroundTruthEntry> = read_jsonl(&ground_truth_path)
        .with_context(|| format!("failed to load ground truth for {document}"))?;
    if entries.is_empty() {
        bail!("no entries found in answers file: {}", answers_path.display());
    }
    Ok((entries, index_ground_truth(ground_truth)))
}

/// Scores a file of precomputed answers. Nothing is written when the
/// answers or ground truth cannot be loaded.
fn judge_answers_file(
    layout: &DataLayout,
    document: &str,
    track: BenchmarkTrack,
    answers_path: &Path,
    scorer: &Scorer,
) -> Result<EvaluationOutcome> {
    let started = Utc::now();
    let results_path = layout.judged_output_path(answers_path, scorer.judge_model());

    let (entries, ground_truth) = load_inputs(layout, document, track, answers_path)?;

    info!(
        document,
        answers = %answers_path.display(),
        judge = scorer.judge_model(),
        benchmark = %track,
        output = %results_path.display(),
        "judging precomputed answers"
    );

    let precomputed_run = PrecomputedRun {
        document,
        track,
        answers_path,
    };
    let outcome = judge_precomputed(&precomputed_run, &entries, &ground_truth, scorer);

    persist_outcome(
        RunInfo {
            mode: "judge",
            started,
            document,
            track,
            extractor_model: None,
            judge_model: scorer.judge_model(),
            source_path: answers_path,
        },
        &outcome,
        &results_path,
    )?;

    if outcome.failures > 0 {
        warn!(failures = outcome.failures, "judging finished with failures");
    }
    info!(
        answers = entries.len(),
        failures = outcome.failures,
        "judging complete"
    );
    Ok(outcome)
}
