//! Voice listing

use serde::Serialize;

use crate::domain::voice::{AVAILABLE_VOICES, Voice};

#[derive(Debug, Clone, Serialize)]
pub struct VoiceListing {
    #[serde(flatten)]
    pub voice: &'static Voice,
    pub recommended: bool,
}

/// Full catalog; entries suited to `learner_age` are flagged.
pub fn list_voices(learner_age: Option<u8>) -> Vec<VoiceListing> {
    AVAILABLE_VOICES
        .iter()
        .map(|voice| VoiceListing {
            voice,
            recommended: learner_age.is_some_and(|age| voice.suits_age(age)),
        })
        .collect()
}
