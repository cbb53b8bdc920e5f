use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{BenchmarkTrack, DataLayout, ModelAllowList};
use crate::providers::HttpSettings;

#[derive(Parser, Debug)]
#[command(
    name = "pdfbench",
    version,
    about = "PDF question-answering benchmark: extract, judge, aggregate"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask an extractor every question about one document, then judge the answers
    Evaluate(EvaluateArgs),
    /// Judge a file of precomputed answers without calling an extractor
    Judge(JudgeArgs),
    /// Summarize one or more result files
    Aggregate(AggregateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    #[arg(long, default_value = "prompts")]
    pub prompts_dir: PathBuf,
}

impl LayoutArgs {
    pub fn layout(&self) -> DataLayout {
        DataLayout {
            data_dir: self.data_dir.clone(),
            results_dir: self.results_dir.clone(),
            prompts_dir: self.prompts_dir.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Replaces the built-in extractor allow-list; repeatable
    #[arg(long = "allowed-extractor")]
    pub allowed_extractors: Vec<String>,

    /// Replaces the built-in judge allow-list; repeatable
    #[arg(long = "allowed-judge")]
    pub allowed_judges: Vec<String>,

    #[arg(long, default_value_t = 600)]
    pub timeout_secs: u64,
}

impl ProviderArgs {
    pub fn allow_list(&self) -> ModelAllowList {
        ModelAllowList::from_overrides(&self.allowed_extractors, &self.allowed_judges)
    }

    pub fn http(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub layout: LayoutArgs,

    #[command(flatten)]
    pub providers: ProviderArgs,

    /// Document key, e.g. `microsoft_esg_2025`
    #[arg(long)]
    pub doc: String,

    #[arg(long, value_enum, ignore_case = true)]
    pub benchmark: BenchmarkTrack,

    #[arg(long, default_value = "openai/gpt-5.1")]
    pub extractor: String,

    #[arg(long, default_value = "deepseek/deepseek-v3.2")]
    pub judge: String,
}

#[derive(Args, Debug, Clone)]
pub struct JudgeArgs {
    #[command(flatten)]
    pub layout: LayoutArgs,

    #[command(flatten)]
    pub providers: ProviderArgs,

    #[arg(long)]
    pub doc: String,

    /// JSONL file of `{question, model_answer}` or `{question, answer, rationale}` rows
    #[arg(long)]
    pub answers: PathBuf,

    #[arg(long, value_enum, ignore_case = true)]
    pub benchmark: BenchmarkTrack,

    #[arg(long, default_value = "deepseek/deepseek-v3.2")]
    pub judge: String,
}

#[derive(Args, Debug, Clone)]
pub struct AggregateArgs {
    #[arg(required = true)]
    pub results: Vec<PathBuf>,

    /// Print the full summary as JSON instead of percentage lines
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
