//! Static model catalog.

use serde::Serialize;

pub const FLASH_MODEL: &str = "gemini-2.5-flash";
pub const PRO_MODEL: &str = "gemini-2.5-pro";
pub const IMAGE_EDIT_MODEL: &str = "gemini-2.5-flash-image-preview";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmModel {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    pub is_external: bool,
    /// Can be "downloaded" for offline use through the model manager
    pub is_downloadable: bool,
}

pub static MODELS: &[LlmModel] = &[
    LlmModel {
        id: FLASH_MODEL,
        name: "Gemini 2.5 Flash",
        provider: "Google",
        is_external: false,
        is_downloadable: false,
    },
    LlmModel {
        id: PRO_MODEL,
        name: "Gemini 2.5 Pro",
        provider: "Google",
        is_external: false,
        is_downloadable: false,
    },
    LlmModel {
        id: IMAGE_EDIT_MODEL,
        name: "Gemini 2.5 Flash Image",
        provider: "Google",
        is_external: false,
        is_downloadable: false,
    },
    LlmModel {
        id: "gemini-2.5-flash-lite",
        name: "Gemini 2.5 Flash Lite",
        provider: "Google",
        is_external: false,
        is_downloadable: true,
    },
    LlmModel {
        id: "gemma-3-4b",
        name: "Gemma 3 4B",
        provider: "Google",
        is_external: true,
        is_downloadable: true,
    },
];

pub fn find_model(id: &str) -> Option<&'static LlmModel> {
    MODELS.iter().find(|m| m.id == id)
}

/// The model shown when nothing else is selected
pub fn default_model() -> &'static LlmModel {
    find_model(FLASH_MODEL).unwrap_or(&MODELS[0])
}

/// The image-preview model only returns text+image and rejects tool use
pub fn supports_tools(model_id: &str) -> bool {
    model_id != IMAGE_EDIT_MODEL
}

pub fn generates_images(model_id: &str) -> bool {
    model_id == IMAGE_EDIT_MODEL
}
