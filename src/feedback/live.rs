use serde::Serialize;

use super::messages::LiveFeedback;

/// Feedback shown next to the video while recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveFeedbackState {
    pub eye_contact: String,
    pub sentiment: String,
    pub posture: String,
}

impl Default for LiveFeedbackState {
    fn default() -> Self {
        Self {
            eye_contact: "Unknown".to_string(),
            sentiment: "Neutral".to_string(),
            posture: "Unknown".to_string(),
        }
    }
}

impl LiveFeedbackState {
    /// Replace every field with the values mapped from `feedback`.
    /// No averaging: the latest message wins.
    pub fn apply(&mut self, feedback: &LiveFeedback) {
        *self = Self::from_feedback(feedback);
    }

    pub fn from_feedback(feedback: &LiveFeedback) -> Self {
        let attention = feedback.attention_status.trim().to_ascii_lowercase();

        let eye_contact = match attention.as_str() {
            "centered" => "Good",
            "looking away" => "Poor",
            _ => "Unknown",
        };

        let posture = match &feedback.posture {
            Some(posture) => title_case(posture),
            None if attention == "poor posture" => "Poor".to_string(),
            None => "Good".to_string(),
        };

        let sentiment = feedback
            .sentiment
            .as_deref()
            .map(title_case)
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            eye_contact: eye_contact.to_string(),
            sentiment,
            posture,
        }
    }
}

fn title_case(value: &str) -> String {
    let value = value.trim();
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => "Unknown".to_string(),
    }
}
