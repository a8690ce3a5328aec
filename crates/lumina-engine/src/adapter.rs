use anyhow::Result;
use lumina_contracts::attachment::{data_url, Attachment, DEFAULT_IMAGE_MIME};
use lumina_contracts::settings::{resolve_style, GenerationSettings, ImageResolution};
use serde::Serialize;
use tracing::{debug, error};

use crate::wire::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig, Part,
};

/// Appended when a tier above the API maximum is requested at the maximum.
///
/// The label the user picked (8K) is kept for display while the upstream
/// receives 4K; this phrase stands in for the missing pixels.
pub const DETAIL_BOOST: &str =
    "8k resolution, highly detailed, photorealistic texture, unreal engine 5 render, sharp focus, ray tracing";

const RESPONSE_MODALITIES: [&str; 2] = ["TEXT", "IMAGE"];

/// The upstream image generation endpoint.
pub trait GenerationApi: Send + Sync {
    fn name(&self) -> &str;
    fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPlan {
    pub prompt: String,
    pub requested_resolution: ImageResolution,
    pub api_resolution: ImageResolution,
    pub detail_boosted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GenerationOutput {
    pub image_url: Option<String>,
    pub text: Option<String>,
}

impl GenerationOutput {
    pub fn is_empty(&self) -> bool {
        self.image_url.is_none() && self.text.is_none()
    }
}

/// Turns a prompt and settings into one upstream call.
///
/// Stateless across calls; the only shared piece is the API client.
pub struct ImageAdapter<A: GenerationApi> {
    api: A,
    model: String,
}

impl<A: GenerationApi> ImageAdapter<A> {
    pub fn new(api: A, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn generate(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
        attachment: Option<&Attachment>,
    ) -> Result<GenerationOutput> {
        let (plan, request) = build_request(prompt, settings, attachment);
        debug!(
            provider = self.api.name(),
            model = %self.model,
            prompt = %plan.prompt,
            image_size = %plan.api_resolution,
            aspect_ratio = %settings.aspect_ratio,
            detail_boosted = plan.detail_boosted,
            has_attachment = attachment.is_some(),
            "generating image"
        );

        let response = match self.api.generate_content(&self.model, &request) {
            Ok(response) => response,
            Err(err) => {
                error!(provider = self.api.name(), error = %format!("{err:#}"), "generation request failed");
                return Err(err);
            }
        };
        Ok(extract_output(&response))
    }
}

/// Final prompt and upstream tier for `settings`.
pub fn compose_prompt(prompt: &str, settings: &GenerationSettings) -> PromptPlan {
    let style = resolve_style(&settings.style);
    let (api_resolution, detail_boosted) = settings.resolution.api_tier();
    let boost = if detail_boosted { DETAIL_BOOST } else { "" };

    let composed = [prompt, style.prompt_modifier, boost]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<&str>>()
        .join(", ");

    PromptPlan {
        prompt: composed,
        requested_resolution: settings.resolution,
        api_resolution,
        detail_boosted,
    }
}

pub fn build_request(
    prompt: &str,
    settings: &GenerationSettings,
    attachment: Option<&Attachment>,
) -> (PromptPlan, GenerateContentRequest) {
    let plan = compose_prompt(prompt, settings);

    let mut parts = Vec::with_capacity(2);
    if let Some(attachment) = attachment {
        parts.push(Part::inline(
            attachment.mime_type.clone(),
            attachment.payload(),
        ));
    }
    parts.push(Part::text(plan.prompt.clone()));

    let request = GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            response_modalities: RESPONSE_MODALITIES.iter().map(|m| m.to_string()).collect(),
            image_config: ImageConfig {
                aspect_ratio: settings.aspect_ratio.as_str().to_string(),
                image_size: plan.api_resolution.as_str().to_string(),
            },
        },
    };
    (plan, request)
}

/// First inline part becomes the image; text parts are joined in order.
pub fn extract_output(response: &GenerateContentResponse) -> GenerationOutput {
    let parts = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or_default();

    let mut image_url = None;
    let mut texts: Vec<&str> = Vec::new();
    for part in parts {
        if let Some(inline) = part.inline_data.as_ref().filter(|inline| !inline.data.is_empty()) {
            if image_url.is_none() {
                let mime = inline
                    .mime_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|mime| !mime.is_empty())
                    .unwrap_or(DEFAULT_IMAGE_MIME);
                image_url = Some(data_url(mime, &inline.data));
            }
            continue;
        }
        if let Some(text) = part.text.as_deref().filter(|text| !text.is_empty()) {
            texts.push(text);
        }
    }

    GenerationOutput {
        image_url,
        text: if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        },
    }
}
