use std::path::Path;

use serde_json::{Value, json};
use tracing::debug;

use super::{Extractor, Judge, ensure_success, pdf_data_url, text_at};
use crate::error::EvalError;
use crate::model::ModelAnswer;
use crate::parse::parse_model_json;
use crate::prompts::EXTRACTOR_SYSTEM_PROMPT;

const CHAT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const PROVIDER: &str = "openrouter";

#[derive(Clone)]
pub struct OpenRouterClient {
    api_key: String,
    http: reqwest::blocking::Client,
}

impl OpenRouterClient {
    pub fn new(api_key: String, http: reqwest::blocking::Client) -> Self {
        Self { api_key, http }
    }

    /// Posts a chat-completions body and returns the first choice's content.
    pub fn chat(&self, body: &Value, title: &str) -> Result<String, EvalError> {
        let response = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "http://localhost")
            .header("X-Title", title)
            .json(body)
            .send()?;

        let body = ensure_success(response, PROVIDER)?;
        Ok(text_at(&body, "/choices/0/message/content", PROVIDER)?
            .trim()
            .to_string())
    }
}

pub struct OpenRouterExtractor {
    model: String,
    client: OpenRouterClient,
}

impl OpenRouterExtractor {
    pub fn new(model: &str, client: OpenRouterClient) -> Self {
        Self {
            model: model.to_string(),
            client,
        }
    }
}

impl Extractor for OpenRouterExtractor {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn extract(&self, question: &str, pdf_path: &Path) -> Result<ModelAnswer, EvalError> {
        let filename = pdf_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document.pdf");
        let body = extraction_request(&self.model, question, filename, &pdf_data_url(pdf_path)?);

        debug!(model = %self.model, pdf = %pdf_path.display(), "sending extractor request");
        let raw = self.client.chat(&body, "Benchmark-Pipeline")?;
        ModelAnswer::from_extractor_value(parse_model_json(&raw)?)
    }
}

pub struct OpenRouterJudge {
    model: String,
    client: OpenRouterClient,
}

impl OpenRouterJudge {
    pub fn new(model: &str, client: OpenRouterClient) -> Self {
        Self {
            model: model.to_string(),
            client,
        }
    }
}

impl Judge for OpenRouterJudge {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, EvalError> {
        let body = judge_request(&self.model, system_prompt, user_prompt);
        debug!(model = %self.model, "sending judge request");
        self.client.chat(&body, "Benchmark-Judge")
    }
}

fn extraction_request(model: &str, question: &str, filename: &str, data_url: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": EXTRACTOR_SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": question },
                    {
                        "type": "file",
                        "file": {
                            "filename": filename,
                            "mime_type": "application/pdf",
                            "file_data": data_url,
                        },
                    },
                ],
            },
        ],
        "include_reasoning": false,
    })
}

fn judge_request(model: &str, system_prompt: &str, user_prompt: &str) -> Value {
    json!({
        "model": model,
        "temperature": 0.0,
        "top_p": 1.0,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_prompt },
        ],
        "reasoning": { "effort": "high" },
        "include_reasoning": false,
    })
}
