//! The cognitive lens: framing text injected into the system instruction,
//! the progress steps shown while a reply is pending, and the prompt used
//! to re-read an earlier message through a lens.

use shared::CognitiveState;
use std::time::Duration;

/// Delay between two flow steps completing
pub const FLOW_STEP_DELAY: Duration = Duration::from_millis(700);

pub fn framing(state: CognitiveState) -> &'static str {
    match state {
        CognitiveState::Focused => "Cognitive state: FOCUSED. Be direct and precise. Answer the exact question first, keep digressions out, and prefer concrete steps over general advice.",
        CognitiveState::Creative => "Cognitive state: CREATIVE. Explore unexpected angles, use vivid language and analogies, and offer several divergent ideas before converging.",
        CognitiveState::Critical => "Cognitive state: CRITICAL. Examine claims skeptically, surface hidden assumptions, weigh evidence on both sides, and state the weaknesses of your own answer.",
        CognitiveState::Synthetic => "Cognitive state: SYNTHETIC. Connect ideas across domains, integrate multiple perspectives into one coherent picture, and end with a unifying summary.",
    }
}

pub fn label(state: CognitiveState) -> &'static str {
    match state {
        CognitiveState::Focused => "Focused",
        CognitiveState::Creative => "Creative",
        CognitiveState::Critical => "Critical",
        CognitiveState::Synthetic => "Synthetic",
    }
}

pub fn flow_steps(state: CognitiveState) -> &'static [&'static str] {
    match state {
        CognitiveState::Focused => &[
            "Isolating the core question",
            "Filtering out noise",
            "Drafting a precise answer",
        ],
        CognitiveState::Creative => &[
            "Scanning for unusual connections",
            "Generating divergent ideas",
            "Shaping the most vivid one",
        ],
        CognitiveState::Critical => &[
            "Identifying claims and assumptions",
            "Weighing the evidence",
            "Stress-testing the conclusion",
        ],
        CognitiveState::Synthetic => &[
            "Gathering perspectives",
            "Mapping links between them",
            "Integrating into one view",
        ],
    }
}

/// When step `index` should show as complete, measured from request start
pub fn step_completion_delay(index: usize) -> Duration {
    FLOW_STEP_DELAY * (index as u32 + 1)
}

/// Prompt asking the model to re-examine `text` through `lens`.
pub fn analysis_prompt(lens: CognitiveState, text: &str) -> String {
    let instruction = match lens {
        CognitiveState::Focused => "Distill the following response to its essential points and say what, if anything, should be done next.",
        CognitiveState::Creative => "Reimagine the following response: suggest fresh angles, metaphors or alternative directions it could take.",
        CognitiveState::Critical => "Critically evaluate the following response: check its accuracy, point out weak reasoning or missing evidence, and list counterarguments.",
        CognitiveState::Synthetic => "Synthesize the following response with related ideas from other fields and summarize the bigger picture it fits into.",
    };
    format!("{}\n\n---\n{}\n---", instruction, text.trim())
}
