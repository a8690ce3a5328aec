mod adapter;
mod config;
mod credentials;
mod errors;
mod gemini;
mod session;
pub mod wire;

pub use adapter::{
    build_request, compose_prompt, extract_output, GenerationApi, GenerationOutput, ImageAdapter,
    PromptPlan, DETAIL_BOOST,
};
pub use config::{EngineConfig, DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL};
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use errors::{CredentialError, UpstreamError};
pub use gemini::GeminiClient;
pub use session::{ChatSession, EMPTY_RESULT_MESSAGE, ERROR_MESSAGE};
