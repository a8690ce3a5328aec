use serde::Serialize;

pub const NO_STYLE_ID: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StylePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt_modifier: &'static str,
}

const STYLE_PRESETS: &[StylePreset] = &[
    StylePreset {
        id: NO_STYLE_ID,
        name: "No Style",
        prompt_modifier: "",
    },
    StylePreset {
        id: "photorealistic",
        name: "Photorealistic",
        prompt_modifier:
            "highly detailed, photorealistic, 8k resolution, cinematic lighting, sharp focus",
    },
    StylePreset {
        id: "cyberpunk",
        name: "Cyberpunk",
        prompt_modifier: "cyberpunk style, neon lights, high contrast, futuristic, sci-fi aesthetic, detailed tech",
    },
    StylePreset {
        id: "anime",
        name: "Anime",
        prompt_modifier:
            "anime style, vibrant colors, clean lines, studio ghibli inspired, high quality 2D art",
    },
    StylePreset {
        id: "digital-art",
        name: "Digital Art",
        prompt_modifier:
            "digital art, trending on artstation, masterpiece, intricate details, vivid colors",
    },
    StylePreset {
        id: "oil-painting",
        name: "Oil Painting",
        prompt_modifier:
            "oil painting texture, visible brushstrokes, classical art style, rich colors",
    },
    StylePreset {
        id: "concept-art",
        name: "Concept Art",
        prompt_modifier: "concept art, matte painting, epic scale, atmospheric, rule of thirds",
    },
    StylePreset {
        id: "3d-render",
        name: "3D Render",
        prompt_modifier: "3d render, unreal engine 5, ray tracing, global illumination, hyper-realistic texture",
    },
];

/// Catalog in display order; the no-style preset comes first.
pub fn style_presets() -> &'static [StylePreset] {
    STYLE_PRESETS
}

/// Looks up a preset by id. Unknown ids resolve to the no-style preset.
pub fn resolve_style(id: &str) -> &'static StylePreset {
    STYLE_PRESETS
        .iter()
        .find(|preset| preset.id == id)
        .unwrap_or(&STYLE_PRESETS[0])
}
