use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};

use crate::adapter::GenerationApi;
use crate::config::EngineConfig;
use crate::credentials::CredentialSource;
use crate::errors::UpstreamError;
use crate::wire::{GenerateContentRequest, GenerateContentResponse};

const PROVIDER: &str = "Gemini";
const ERROR_BODY_MAX_CHARS: usize = 512;
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Blocking client for `models/{model}:generateContent`.
///
/// The key travels in the `x-goog-api-key` header, never in the URL, so
/// transport errors and logs cannot carry it.
///
/// No request timeout is set; a call runs until the server answers or the
/// connection fails.
pub struct GeminiClient {
    api_base: String,
    http: HttpClient,
    credentials: Arc<dyn CredentialSource>,
}

impl GeminiClient {
    pub fn new(api_base: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(None::<Duration>)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            http,
            credentials,
        })
    }

    pub fn from_config(config: &EngineConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        Self::new(config.api_base.clone(), credentials)
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl GenerationApi for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let api_key = self.credentials.resolve_key()?;
        let endpoint = self.endpoint_for_model(model);
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("{PROVIDER} request failed ({endpoint})"))?;
        response_json_or_error(response)
    }
}

fn response_json_or_error(response: HttpResponse) -> Result<GenerateContentResponse> {
    let status = response.status();
    let body = response
        .text()
        .with_context(|| format!("{PROVIDER} response body read failed"))?;
    parse_response_body(status.as_u16(), status.is_success(), &body)
}

fn parse_response_body(code: u16, success: bool, body: &str) -> Result<GenerateContentResponse> {
    if !success {
        return Err(UpstreamError::Status {
            provider: PROVIDER,
            code,
            body: truncate_text(body, ERROR_BODY_MAX_CHARS),
        }
        .into());
    }
    serde_json::from_str(body).map_err(|source| {
        UpstreamError::InvalidPayload {
            provider: PROVIDER,
            source,
        }
        .into()
    })
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
