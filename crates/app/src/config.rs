//! Settings loading and data directory resolution.

use agent_host::languages;
use anyhow::{Context, Result};
use shared::settings::AppSettings;
use std::fs;
use std::path::PathBuf;

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com.local", "Bhargava GPT", "BhargavaGPT")
}

pub fn config_path() -> Option<PathBuf> {
    project_dirs().map(|proj| proj.config_dir().join("settings.json"))
}

/// Read `settings.json` and apply environment overrides.
///
/// A missing file gives defaults; an unreadable one is logged and ignored.
pub fn load_settings() -> AppSettings {
    let mut settings = config_path()
        .filter(|p| p.exists())
        .and_then(|path| match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<AppSettings>(&bytes) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!("Ignoring invalid {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Could not read {}: {}", path.display(), e);
                None
            }
        })
        .unwrap_or_default();
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn apply_env_overrides(settings: &mut AppSettings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = var("GEMINI_API_KEY").or_else(|| var("API_KEY")) {
        settings.gemini.api_key = Some(key);
    }
    if let Some(url) = var("GEMINI_BASE_URL") {
        settings.gemini.base_url = Some(url);
    }
    if let Some(dir) = var("BHARGAVA_DATA_DIR") {
        settings.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(lang) = var("BHARGAVA_LANGUAGE") {
        if languages::is_supported(&lang) {
            settings.language = lang;
        } else {
            tracing::warn!("Unsupported BHARGAVA_LANGUAGE {}, keeping {}", lang, settings.language);
        }
    }
}

/// Directory for chats and model state, created if needed
pub fn data_dir(settings: &AppSettings) -> Result<PathBuf> {
    let dir = match &settings.data_dir {
        Some(dir) => dir.clone(),
        None => project_dirs()
            .map(|p| p.data_dir().to_path_buf())
            .context("could not determine a data directory; set BHARGAVA_DATA_DIR")?,
    };
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = AppSettings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("API_KEY", "fallback"),
                ("GEMINI_BASE_URL", "http://localhost:9000/v1beta"),
                ("BHARGAVA_DATA_DIR", "/tmp/bhargava"),
                ("BHARGAVA_LANGUAGE", "fr-FR"),
            ]),
        );
        assert_eq!(settings.gemini.api_key.as_deref(), Some("fallback"));
        assert_eq!(settings.gemini.base_url.as_deref(), Some("http://localhost:9000/v1beta"));
        assert_eq!(settings.data_dir, Some(PathBuf::from("/tmp/bhargava")));
        assert_eq!(settings.language, "fr-FR");
    }

    #[test]
    fn test_gemini_key_wins_and_blank_ignored() {
        let mut settings = AppSettings::default();
        settings.gemini.api_key = Some("from-file".into());
        apply_env_overrides(&mut settings, env(&[("GEMINI_API_KEY", "  "), ("BHARGAVA_LANGUAGE", "xx")]));
        assert_eq!(settings.gemini.api_key.as_deref(), Some("from-file"));
        assert_eq!(settings.language, "en-US");

        apply_env_overrides(&mut settings, env(&[("GEMINI_API_KEY", "g"), ("API_KEY", "a")]));
        assert_eq!(settings.gemini.api_key.as_deref(), Some("g"));
    }

    #[test]
    fn test_data_dir_created() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = AppSettings::default();
        settings.data_dir = Some(tmp.path().join("nested"));
        let dir = data_dir(&settings).unwrap();
        assert!(dir.is_dir());
    }
}
