use serde::{Deserialize, Serialize};

use super::result::SessionResult;

/// Comfortable speaking pace, words per minute
const PACE_RANGE: (f64, f64) = (120.0, 160.0);
/// Points lost per wpm outside the pace range
const PACE_PENALTY: f64 = 1.5;
/// Points lost per filler word per minute
const FILLER_PENALTY: f64 = 10.0;

/// Scores shown on the results view, 0-100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultScores {
    pub pace_score: f64,
    pub filler_words_per_minute: f64,
    pub filler_score: f64,
    pub clarity_score: f64,
    pub speech_score: f64,
    pub video_score: Option<f64>,
    pub overall_score: f64,
}

impl ResultScores {
    /// Pure function of the result
    pub fn compute(result: &SessionResult) -> Self {
        let speech = result.speech_metrics();

        let wpm = speech.words_per_minute;
        let pace_score = if wpm < PACE_RANGE.0 {
            100.0 - (PACE_RANGE.0 - wpm) * PACE_PENALTY
        } else if wpm > PACE_RANGE.1 {
            100.0 - (wpm - PACE_RANGE.1) * PACE_PENALTY
        } else {
            100.0
        };

        let minutes = result.duration_minutes();
        let filler_words_per_minute = if minutes > 0.0 {
            speech.filler_word_count as f64 / minutes
        } else {
            speech.filler_word_count as f64
        };
        let filler_score = 100.0 - filler_words_per_minute * FILLER_PENALTY;

        // Intelligibility arrives as a 0-1 ratio; older services sent percent
        let intelligibility = speech.speech_intelligibility;
        let clarity_score = if intelligibility > 1.0 {
            intelligibility
        } else {
            intelligibility * 100.0
        };

        let pace_score = clamp_score(pace_score);
        let filler_score = clamp_score(filler_score);
        let clarity_score = clamp_score(clarity_score);
        let speech_score = 0.4 * pace_score + 0.3 * filler_score + 0.3 * clarity_score;

        let video_score = result.video_metrics().map(|video| {
            clamp_score((video.eye_contact_score + video.sentiment_score + video.posture_score) / 3.0)
        });

        let overall_score = match video_score {
            Some(video) => 0.6 * speech_score + 0.4 * video,
            None => speech_score,
        };

        Self {
            pace_score: round1(pace_score),
            filler_words_per_minute: round1(filler_words_per_minute),
            filler_score: round1(filler_score),
            clarity_score: round1(clarity_score),
            speech_score: round1(speech_score),
            video_score: video_score.map(round1),
            overall_score: round1(overall_score),
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
