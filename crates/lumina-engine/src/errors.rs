use thiserror::Error;

/// Failures reported by the generation endpoint itself.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{provider} request failed ({code}): {body}")]
    Status {
        provider: &'static str,
        code: u16,
        body: String,
    },
    #[error("{provider} returned invalid JSON payload")]
    InvalidPayload {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no API key selected (set GEMINI_API_KEY or GOOGLE_API_KEY)")]
    Missing,
}
