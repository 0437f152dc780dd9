//! Speech helpers that do not depend on a particular speech engine:
//! voice choice for read-aloud, transcript assembly from recognition
//! results, and user-facing recognition errors.
//!
//! The `bhargava` terminal has no microphone or synthesis engine, so
//! nothing in it calls these. They are library API for front ends that
//! do have one: feed recognition events to [`TranscriptBuffer`], send the
//! final utterance with `AgentHost::send_message`, and pass failures
//! through [`recognition_error_message`] to `AgentHost::record_error`.

/// A synthesis voice as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Name fragments that identify the preferred voices across platforms
const PREFERRED_VOICE_HINTS: [&str; 4] = ["female", "samantha", "zira", "femenino"];

/// Pick a read-aloud voice for `lang`.
///
/// Only voices matching a preferred name hint are considered, tried in
/// order: exact language, same base language, any English, then the first.
pub fn select_voice<'a>(voices: &'a [Voice], lang: &str) -> Option<&'a Voice> {
    let preferred: Vec<&Voice> = voices
        .iter()
        .filter(|v| {
            let name = v.name.to_lowercase();
            PREFERRED_VOICE_HINTS.iter().any(|h| name.contains(h))
        })
        .collect();

    let base = lang.split('-').next().unwrap_or(lang);
    preferred
        .iter()
        .find(|v| v.lang == lang)
        .or_else(|| preferred.iter().find(|v| v.lang.starts_with(base)))
        .or_else(|| preferred.iter().find(|v| v.lang.starts_with("en")))
        .or_else(|| preferred.first())
        .copied()
}

/// One recognition alternative plus its finality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

/// Assembles recognition events into either a finished utterance or the
/// interim text to display while the user is still talking.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    interim: String,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the full result list of one recognition event.
    ///
    /// Returns the trimmed final utterance when results from `result_index`
    /// on contain final text; the caller should then stop listening.
    pub fn on_result(&mut self, results: &[RecognitionResult], result_index: usize) -> Option<String> {
        let final_text: String = results
            .iter()
            .skip(result_index)
            .filter(|r| r.is_final)
            .map(|r| r.transcript.as_str())
            .collect();

        let final_text = final_text.trim();
        if !final_text.is_empty() {
            self.interim.clear();
            return Some(final_text.to_string());
        }

        self.interim = results.iter().map(|r| r.transcript.as_str()).collect();
        None
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn reset(&mut self) {
        self.interim.clear();
    }
}

pub fn recognition_error_message(code: &str) -> String {
    if code == "not-allowed" {
        "Microphone permission was denied. Please allow microphone access in your system settings to use the voice assistant.".to_string()
    } else {
        format!("A speech recognition error occurred: {}", code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Daniel", "en-GB"),
            Voice::new("Google Female Hindi", "hi-IN"),
            Voice::new("Samantha", "en-US"),
            Voice::new("Microsoft Zira", "en-GB"),
            Voice::new("Paulina Femenino", "es-MX"),
        ]
    }

    #[test]
    fn test_exact_language() {
        assert_eq!(select_voice(&voices(), "en-US").unwrap().name, "Samantha");
        assert_eq!(select_voice(&voices(), "hi-IN").unwrap().name, "Google Female Hindi");
    }

    #[test]
    fn test_base_language_then_english() {
        assert_eq!(select_voice(&voices(), "es-ES").unwrap().name, "Paulina Femenino");
        // No French voice: first English match wins
        assert_eq!(select_voice(&voices(), "fr-FR").unwrap().name, "Samantha");
    }

    #[test]
    fn test_first_preferred_when_no_english() {
        let v = vec![Voice::new("Daniel", "en-GB"), Voice::new("Anna Female", "de-DE")];
        assert_eq!(select_voice(&v, "ja-JP").unwrap().name, "Anna Female");
        assert!(select_voice(&[Voice::new("Daniel", "en-GB")], "en-GB").is_none());
    }

    #[test]
    fn test_transcript_final_and_interim() {
        let mut buf = TranscriptBuffer::new();
        let interim = vec![RecognitionResult { transcript: "hello wor".into(), is_final: false }];
        assert!(buf.on_result(&interim, 0).is_none());
        assert_eq!(buf.interim(), "hello wor");

        let done = vec![
            RecognitionResult { transcript: "ignored ".into(), is_final: true },
            RecognitionResult { transcript: " hello world ".into(), is_final: true },
        ];
        assert_eq!(buf.on_result(&done, 1).as_deref(), Some("hello world"));
        assert_eq!(buf.interim(), "");
    }

    #[test]
    fn test_error_messages() {
        assert!(recognition_error_message("not-allowed").contains("Microphone permission"));
        assert_eq!(
            recognition_error_message("network"),
            "A speech recognition error occurred: network"
        );
    }
}
