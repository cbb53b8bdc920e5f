use std::fs;
use std::path::Path;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::config::{GEMINI_API_KEY_ENV, ModelAllowList, OPENROUTER_API_KEY_ENV, require_env};
use crate::error::EvalError;
use crate::model::ModelAnswer;

mod gemini;
mod openrouter;

pub use gemini::GeminiExtractor;
pub use openrouter::{OpenRouterClient, OpenRouterExtractor, OpenRouterJudge};

/// Answers one question about one PDF.
pub trait Extractor {
    fn model_id(&self) -> &str;

    fn extract(&self, question: &str, pdf_path: &Path) -> Result<ModelAnswer, EvalError>;
}

/// Sends a system instruction plus a filled prompt to a judge model and
/// returns its raw reply text.
pub trait Judge {
    fn model_id(&self) -> &str;

    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, EvalError>;
}

#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub timeout: Duration,
}

impl HttpSettings {
    pub fn client(&self) -> Result<reqwest::blocking::Client, EvalError> {
        Ok(reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?)
    }
}

/// Validates the model against the allow-list and reads its credential
/// before any request is made.
pub fn build_extractor(
    model: &str,
    allow_list: &ModelAllowList,
    http: HttpSettings,
) -> Result<Box<dyn Extractor>, EvalError> {
    allow_list.check_extractor(model)?;

    if model.starts_with("google/") {
        let api_key = require_env(GEMINI_API_KEY_ENV)?;
        return Ok(Box::new(GeminiExtractor::new(model, api_key, http.client()?)));
    }

    let api_key = require_env(OPENROUTER_API_KEY_ENV)?;
    let client = OpenRouterClient::new(api_key, http.client()?);
    Ok(Box::new(OpenRouterExtractor::new(model, client)))
}

pub fn build_judge(
    model: &str,
    allow_list: &ModelAllowList,
    http: HttpSettings,
) -> Result<Box<dyn Judge>, EvalError> {
    allow_list.check_judge(model)?;

    let api_key = require_env(OPENROUTER_API_KEY_ENV)?;
    let client = OpenRouterClient::new(api_key, http.client()?);
    Ok(Box::new(OpenRouterJudge::new(model, client)))
}

fn read_pdf_base64(pdf_path: &Path) -> Result<String, EvalError> {
    let bytes = fs::read(pdf_path).map_err(|source| EvalError::Io {
        path: pdf_path.to_path_buf(),
        source,
    })?;
    Ok(STANDARD.encode(bytes))
}

pub fn pdf_data_url(pdf_path: &Path) -> Result<String, EvalError> {
    Ok(format!(
        "data:application/pdf;base64,{}",
        read_pdf_base64(pdf_path)?
    ))
}

fn text_at<'a>(
    body: &'a Value,
    pointer: &str,
    provider: &'static str,
) -> Result<&'a str, EvalError> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| EvalError::Provider {
            provider,
            message: format!("response missing {pointer}: {body}"),
        })
}

fn ensure_success(
    response: reqwest::blocking::Response,
    provider: &'static str,
) -> Result<Value, EvalError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(EvalError::Provider {
            provider,
            message: format!("status {status}: {body}"),
        });
    }
    Ok(response.json()?)
}
