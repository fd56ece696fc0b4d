//! Voice Catalog
//!
//! Tutor voices offered by the realtime provider, with the learner age
//! range each one suits.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub sample_text: &'static str,
    /// Display form of the suitable age range, e.g. `"8-12"`
    pub age_range: &'static str,
    pub gender: &'static str,
    pub personality: &'static str,
    #[serde(skip)]
    pub min_age: u8,
    #[serde(skip)]
    pub max_age: u8,
}

impl Voice {
    pub fn suits_age(&self, age: u8) -> bool {
        (self.min_age..=self.max_age).contains(&age)
    }
}

pub const AVAILABLE_VOICES: [Voice; 6] = [
    Voice {
        id: "shimmer",
        name: "Shimmer",
        description: "Warm and friendly, great for younger students",
        sample_text: "Hi! I'm here to help you learn and figure things out together.",
        age_range: "8-12",
        gender: "female",
        personality: "Encouraging, warm, patient",
        min_age: 8,
        max_age: 12,
    },
    Voice {
        id: "ballad",
        name: "Ballad",
        description: "Clear and energetic, perfect for math and science",
        sample_text: "Hey there! Let's tackle this problem step by step. You've got this!",
        age_range: "10-14",
        gender: "female",
        personality: "Energetic, enthusiastic, motivating",
        min_age: 10,
        max_age: 14,
    },
    Voice {
        id: "alloy",
        name: "Alloy",
        description: "Balanced and steady, good for focused learning",
        sample_text: "Hi! I'm ready to help you understand this. Let's break it down together.",
        age_range: "9-13",
        gender: "neutral",
        personality: "Calm, steady, reliable",
        min_age: 9,
        max_age: 13,
    },
    Voice {
        id: "echo",
        name: "Echo",
        description: "Gentle and supportive, great for reading and writing",
        sample_text: "Hello! Take your time, and let's work through this at your pace.",
        age_range: "8-12",
        gender: "neutral",
        personality: "Gentle, supportive, patient",
        min_age: 8,
        max_age: 12,
    },
    Voice {
        id: "verse",
        name: "Verse",
        description: "Expressive and engaging, perfect for storytelling",
        sample_text: "Hey! This is going to be fun. Let me help you discover the answer!",
        age_range: "9-13",
        gender: "neutral",
        personality: "Expressive, engaging, creative",
        min_age: 9,
        max_age: 13,
    },
    Voice {
        id: "sage",
        name: "Sage",
        description: "Clear and wise, good for older students",
        sample_text: "Hi there. Let's think critically about this problem together.",
        age_range: "11-15",
        gender: "neutral",
        personality: "Professional, clear, focused",
        min_age: 11,
        max_age: 15,
    },
];

pub fn voice_by_id(id: &str) -> Option<&'static Voice> {
    AVAILABLE_VOICES.iter().find(|voice| voice.id == id)
}

pub fn voice_ids() -> Vec<&'static str> {
    AVAILABLE_VOICES.iter().map(|voice| voice.id).collect()
}

pub fn recommended_for_age(age: u8) -> impl Iterator<Item = &'static Voice> {
    AVAILABLE_VOICES.iter().filter(move |voice| voice.suits_age(age))
}
