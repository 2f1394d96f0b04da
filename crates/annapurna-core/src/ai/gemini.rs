use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AnnapurnaError, Result};

/// Thin client for the Gemini REST API: `generateContent` for text and the
/// Imagen `predict` endpoint for pictures. No retries, no timeouts.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

// -- generateContent --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

// -- Imagen predict --

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_options: OutputOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// The request URL carries the API key, so drop it from transport errors.
fn redact(e: reqwest::Error) -> AnnapurnaError {
    AnnapurnaError::Http(e.without_url())
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        text_model: String,
        image_model: String,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| crate::config::DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            text_model,
            image_model,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        )
    }

    /// Send `prompt` to the text model asking for a JSON answer and return the
    /// raw text of the first candidate.
    pub async fn generate_json_text(&self, prompt: &str) -> Result<String> {
        let req = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        tracing::debug!(
            model = %self.text_model,
            prompt_len = prompt.len(),
            "gemini generateContent"
        );

        let response = self
            .client
            .post(self.endpoint(&self.text_model, "generateContent"))
            .json(&req)
            .send()
            .await
            .map_err(redact)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".into());
            return Err(AnnapurnaError::Ai(format!(
                "Gemini API error {status}: {body}"
            )));
        }

        let result: GenerateContentResponse = response.json().await.map_err(redact)?;

        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .unwrap_or_default()
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(AnnapurnaError::Ai(
                "Gemini response contained no text".into(),
            ));
        }
        Ok(text)
    }

    /// Generate one 4:3 JPEG for `prompt`, returned as base64.
    pub async fn generate_image_base64(&self, prompt: &str) -> Result<String> {
        let req = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "4:3".to_string(),
                output_options: OutputOptions {
                    mime_type: IMAGE_MIME_TYPE.to_string(),
                },
            },
        };

        tracing::debug!(model = %self.image_model, "imagen predict");

        let response = self
            .client
            .post(self.endpoint(&self.image_model, "predict"))
            .json(&req)
            .send()
            .await
            .map_err(redact)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".into());
            return Err(AnnapurnaError::Ai(format!(
                "Imagen API error {status}: {body}"
            )));
        }

        let result: PredictResponse = response.json().await.map_err(redact)?;

        result
            .predictions
            .into_iter()
            .next()
            .and_then(|p| p.bytes_base64_encoded)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AnnapurnaError::Ai("No image data received from Gemini.".into()))
    }
}
