use std::path::Path;

use serde_json::{Value, json};
use tracing::debug;

use super::{Extractor, ensure_success, read_pdf_base64, text_at};
use crate::error::EvalError;
use crate::model::ModelAnswer;
use crate::parse::parse_model_json;
use crate::prompts::EXTRACTOR_SYSTEM_PROMPT;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const PROVIDER: &str = "gemini";

/// Talks to the Gemini API directly; OpenRouter's file handling is not used
/// for `google/` models.
pub struct GeminiExtractor {
    model: String,
    api_key: String,
    http: reqwest::blocking::Client,
}

impl GeminiExtractor {
    pub fn new(model: &str, api_key: String, http: reqwest::blocking::Client) -> Self {
        Self {
            model: model.to_string(),
            api_key,
            http,
        }
    }

    fn native_model_name(&self) -> &str {
        self.model
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.model)
    }
}

impl Extractor for GeminiExtractor {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn extract(&self, question: &str, pdf_path: &Path) -> Result<ModelAnswer, EvalError> {
        let body = generate_request(question, &read_pdf_base64(pdf_path)?);
        let url = format!("{API_BASE}/{}:generateContent", self.native_model_name());

        debug!(model = %self.model, pdf = %pdf_path.display(), "sending gemini request");
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let body = ensure_success(response, PROVIDER)?;
        let raw = text_at(&body, "/candidates/0/content/parts/0/text", PROVIDER)?;
        ModelAnswer::from_extractor_value(parse_model_json(raw)?)
    }
}

fn generate_request(question: &str, pdf_base64: &str) -> Value {
    let prompt = format!("{EXTRACTOR_SYSTEM_PROMPT}\n\nQuestion:\n{question}\nReturn JSON only.");
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": prompt },
                { "inline_data": { "mime_type": "application/pdf", "data": pdf_base64 } },
            ],
        }],
        "generationConfig": { "response_mime_type": "application/json" },
    })
}
